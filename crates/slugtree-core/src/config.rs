//! Hierarchy configuration.

use crate::defaults;
use crate::paths::DefaultPathNormalizer;

/// Configuration for the hierarchy trigger and path formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyConfig {
    /// Whether fullPath maintenance runs at all.
    pub enabled: bool,
    /// Document types that participate in the page tree.
    pub document_types: Vec<String>,
    /// Locale served without a path prefix.
    pub default_locale: Option<String>,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::HIERARCHY_ENABLED,
            document_types: vec![defaults::PAGE_DOCUMENT_TYPE.to_string()],
            default_locale: None,
        }
    }
}

impl HierarchyConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `PAGES_HIERARCHY_ENABLED` | `true` | Enable/disable fullPath maintenance |
    /// | `HIERARCHY_DOCUMENT_TYPES` | `api::page.page` | Comma-separated hierarchical types |
    /// | `HIERARCHY_DEFAULT_LOCALE` | unset | Locale served without prefix |
    pub fn from_env() -> Self {
        let enabled = std::env::var("PAGES_HIERARCHY_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(defaults::HIERARCHY_ENABLED);

        let document_types = std::env::var("HIERARCHY_DOCUMENT_TYPES")
            .ok()
            .map(|v| parse_list(&v))
            .filter(|types| !types.is_empty())
            .unwrap_or_else(|| vec![defaults::PAGE_DOCUMENT_TYPE.to_string()]);

        let default_locale = std::env::var("HIERARCHY_DEFAULT_LOCALE")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        Self {
            enabled,
            document_types,
            default_locale,
        }
    }

    /// Enable or disable hierarchy handling.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Replace the set of hierarchical document types.
    pub fn with_document_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.document_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Set the locale served without prefix.
    pub fn with_default_locale(mut self, locale: impl Into<String>) -> Self {
        self.default_locale = Some(locale.into());
        self
    }

    /// Whether `document_type` participates in the hierarchy.
    pub fn is_hierarchical(&self, document_type: &str) -> bool {
        self.document_types.iter().any(|t| t == document_type)
    }

    /// Path normalizer matching this configuration.
    pub fn path_normalizer(&self) -> DefaultPathNormalizer {
        match &self.default_locale {
            Some(locale) => DefaultPathNormalizer::new().with_default_locale(locale.clone()),
            None => DefaultPathNormalizer::new(),
        }
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
