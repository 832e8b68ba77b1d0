//! Job handler contract.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use slugtree_core::{Job, JobType};

/// Context provided to job handlers.
pub struct JobContext {
    /// The job being processed.
    pub job: Job,
}

impl JobContext {
    /// Create a new job context.
    pub fn new(job: Job) -> Self {
        Self { job }
    }

    pub fn document_type(&self) -> &str {
        &self.job.document_type
    }

    pub fn document_id(&self) -> &str {
        &self.job.related_document_id
    }

    pub fn locale(&self) -> &str {
        &self.job.target_locale
    }

    /// Get the job payload.
    pub fn payload(&self) -> Option<&JsonValue> {
        self.job.payload.as_ref()
    }
}

/// Result of job execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobResult {
    /// Job completed successfully.
    Success,
    /// Nothing to do: the job no longer refers to anything actionable.
    /// Counted as a success and removed from the queue.
    Skipped(String),
    /// Job failed with an error message. The job is kept as `failed`.
    Failed(String),
}

impl JobResult {
    /// Whether the job should be removed from the queue.
    pub fn is_success(&self) -> bool {
        !matches!(self, JobResult::Failed(_))
    }
}

/// Trait for job handlers.
///
/// Handlers never return errors: anything that goes wrong is reported as
/// [`JobResult::Failed`] so the runner can record it against the job.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// The job type this handler processes.
    fn job_type(&self) -> JobType;

    /// Execute the job.
    async fn execute(&self, ctx: JobContext) -> JobResult;

    /// Check if this handler can process the given job type.
    fn can_handle(&self, job_type: JobType) -> bool {
        self.job_type() == job_type
    }
}
