//! # slugtree-jobs
//!
//! fullPath maintenance for hierarchical pages.
//!
//! This crate provides:
//! - [`HierarchyTrigger`], the pre-publish hook that queues recalculations
//! - [`RecalculateFullPathHandler`], which recomputes a page's fullPath,
//!   cascades to its children through the queue and keeps one pending
//!   redirect per page
//! - [`CreateRedirectHandler`], which publishes queued redirects
//! - [`JobRunner`] and [`JobWorker`] for draining the queue
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use slugtree_db::{MemoryDocumentStore, MemoryJobRepository, MemoryRedirectStore};
//! use slugtree_jobs::{HierarchyConfig, JobRunner, WorkerBuilder, WorkerConfig};
//!
//! let config = HierarchyConfig::from_env();
//! let jobs = Arc::new(MemoryJobRepository::new());
//! let runner = JobRunner::new(
//!     jobs.clone(),
//!     Arc::new(MemoryDocumentStore::new()),
//!     Arc::new(MemoryRedirectStore::new()),
//!     Arc::new(config.path_normalizer()),
//! );
//!
//! let handle = WorkerBuilder::new(runner)
//!     .with_config(WorkerConfig::from_env())
//!     .with_notify(jobs.job_notify())
//!     .build()
//!     .start();
//!
//! let mut events = handle.events();
//! while let Ok(event) = events.recv().await {
//!     println!("Event: {:?}", event);
//! }
//!
//! handle.shutdown().await?;
//! ```

pub mod handler;
pub mod recalculate;
pub mod redirect;
pub mod runner;
pub mod trigger;
pub mod worker;

// Re-export core types
pub use slugtree_core::*;

pub use handler::{JobContext, JobHandler, JobResult};
pub use recalculate::RecalculateFullPathHandler;
pub use redirect::CreateRedirectHandler;
pub use runner::JobRunner;
pub use trigger::{HierarchyTrigger, ROOT_SLUG_RESERVED};
pub use worker::{JobWorker, WorkerBuilder, WorkerConfig, WorkerEvent, WorkerHandle};
