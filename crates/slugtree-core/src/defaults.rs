//! Centralized default constants for slugtree.
//!
//! **This module is the single source of truth** for shared default values.
//! Configuration types fall back to these when the corresponding environment
//! variable is unset or unparsable.

// =============================================================================
// HIERARCHY
// =============================================================================

/// Document type of the page collection that participates in the hierarchy.
pub const PAGE_DOCUMENT_TYPE: &str = "api::page.page";

/// Hierarchy handling is on unless explicitly disabled.
pub const HIERARCHY_ENABLED: bool = true;

// =============================================================================
// JOB PROCESSING
// =============================================================================

/// Default worker poll interval in milliseconds.
///
/// Enqueues wake the worker through a `Notify` handle, so this interval only
/// matters for jobs inserted behind the repository's back.
pub const JOB_POLL_INTERVAL_MS: u64 = 30_000;

/// Default lease held by a runner on a claimed job, in seconds.
///
/// A claim older than this is considered abandoned (crashed runner) and the
/// job becomes claimable again.
pub const JOB_LEASE_SECS: u64 = 300;

/// Default lease owner reported by runners that are not given an identity.
pub const JOB_WORKER_ID: &str = "slugtree-worker";

/// Capacity of the worker event broadcast channel.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// DATABASE
// =============================================================================

/// Default job store pool size.
pub const DB_MAX_CONNECTIONS: u32 = 5;

/// Default wait for a free pooled connection, in seconds.
pub const DB_ACQUIRE_TIMEOUT_SECS: u64 = 30;
