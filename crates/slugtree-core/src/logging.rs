//! Structured logging schema and field name constants for slugtree.
//!
//! All crates log through `tracing` with these field names so log
//! aggregation can query every subsystem the same way. The macros take
//! field names as identifiers, so call sites spell them out literally; this
//! module is the reference for which names exist.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Job store failure, nothing could be recorded |
//! | WARN  | Job failed and was marked `failed` |
//! | INFO  | Job completions, run summaries, worker lifecycle |
//! | DEBUG | Trigger decisions, cascade and redirect rebase choices |
//! | TRACE | Per-child enqueue during a cascade |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "jobs", "hierarchy", "database"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "runner", "trigger", "recalculate_full_path", "create_redirect", "worker"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "run_all", "enqueue", "claim_next", "before_publish"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Job UUID being processed.
pub const JOB_ID: &str = "job_id";

/// Job type wire name (`RECALCULATE_FULLPATH`, `CREATE_REDIRECT`).
pub const JOB_TYPE: &str = "job_type";

/// Hierarchical document type (e.g. `api::page.page`).
pub const DOCUMENT_TYPE: &str = "document_type";

/// Document identifier the job targets.
pub const DOCUMENT_ID: &str = "document_id";

/// Locale of the targeted document.
pub const LOCALE: &str = "locale";

// ─── Path fields ───────────────────────────────────────────────────────────

/// Path before a change.
pub const OLD_PATH: &str = "old_path";

/// Path after a change.
pub const NEW_PATH: &str = "new_path";

/// Number of direct children re-enqueued by a cascade step.
pub const CHILD_COUNT: &str = "child_count";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of jobs that succeeded in a run.
pub const SUCCEEDED: &str = "succeeded";

/// Number of jobs that failed in a run.
pub const FAILED: &str = "failed";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
