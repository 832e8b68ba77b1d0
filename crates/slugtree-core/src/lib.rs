//! # slugtree-core
//!
//! Core types, traits, and abstractions for slugtree.
//!
//! slugtree keeps the materialized `fullPath` of hierarchical pages in sync
//! with their slugs and parents, and turns path changes into redirects. This
//! crate holds the shared vocabulary: the job model, the page/redirect views
//! the job handlers consume, the collaborator traits, path normalization and
//! configuration.

pub mod config;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod paths;
pub mod traits;
pub mod uuid_utils;

// Re-export commonly used types at crate root
pub use config::HierarchyConfig;
pub use error::{Error, Result};
pub use models::*;
pub use paths::{normalize_full_path, DefaultPathNormalizer, PathNormalizer, ROOT_PAGE_PATH};
pub use traits::*;
pub use uuid_utils::{is_v7, new_v7};
