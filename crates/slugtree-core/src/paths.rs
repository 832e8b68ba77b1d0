//! Page path normalization.
//!
//! Joins path segments into a single absolute path (no duplicate slashes),
//! always rooted at [`ROOT_PAGE_PATH`], and optionally prefixed with a locale.
//!
//! | Input | Locale | Output |
//! |-------|--------|--------|
//! | `[""]` | | `/` |
//! | `[None, None]` | | `/` |
//! | `["/", "//", "///"]` | | `/` |
//! | `["slug"]` | | `/slug` |
//! | `["/", "/slug"]` | | `/slug` |
//! | `["/parent/", "/slug"]` | | `/parent/slug` |
//! | `["parent/1", "slug"]` | | `/parent/1/slug` |
//! | `["", ""]` | `en` | `/en` |
//! | `["/parent", "slug"]` | `en` | `/en/parent/slug` |
//! | `["/en/parent", "slug"]` | `en` | `/en/parent/slug` |

use once_cell::sync::Lazy;
use regex::Regex;

/// Slug and fullPath of the root page. The root's slug can never change.
pub const ROOT_PAGE_PATH: &str = "/";

static REPEATED_SLASHES: Lazy<Regex> = Lazy::new(|| Regex::new(r"/+").expect("valid regex"));

/// Join page path segments into a normalized absolute path.
///
/// Absent and empty segments are skipped. When `locale` is given the result
/// is prefixed with `/{locale}`, unless it already carries that prefix.
pub fn normalize_full_path(segments: &[Option<&str>], locale: Option<&str>) -> String {
    let mut joined = String::from(ROOT_PAGE_PATH);
    for segment in segments.iter().flatten().filter(|s| !s.is_empty()) {
        joined.push('/');
        joined.push_str(segment);
    }
    let full_path = REPEATED_SLASHES.replace_all(&joined, "/").into_owned();

    match locale.filter(|l| !l.is_empty()) {
        Some(locale) => {
            let prefix = format!("/{locale}");
            if full_path == prefix || full_path.starts_with(&format!("{prefix}/")) {
                full_path
            } else if full_path == ROOT_PAGE_PATH {
                prefix
            } else {
                format!("{prefix}{full_path}")
            }
        }
        None => full_path,
    }
}

/// Path formatter consumed by the job handlers.
pub trait PathNormalizer: Send + Sync {
    /// Normalize `segments` into an absolute path for `locale`.
    fn normalize(&self, segments: &[Option<&str>], locale: Option<&str>) -> String;
}

/// [`normalize_full_path`], except that the default locale is served
/// without a prefix.
#[derive(Debug, Clone, Default)]
pub struct DefaultPathNormalizer {
    default_locale: Option<String>,
}

impl DefaultPathNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths for `locale` are left unprefixed.
    pub fn with_default_locale(mut self, locale: impl Into<String>) -> Self {
        self.default_locale = Some(locale.into());
        self
    }

    pub fn default_locale(&self) -> Option<&str> {
        self.default_locale.as_deref()
    }
}

impl PathNormalizer for DefaultPathNormalizer {
    fn normalize(&self, segments: &[Option<&str>], locale: Option<&str>) -> String {
        let locale = locale.filter(|l| self.default_locale.as_deref() != Some(*l));
        normalize_full_path(segments, locale)
    }
}
