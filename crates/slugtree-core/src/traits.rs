//! Core traits for slugtree abstractions.
//!
//! The job queue is owned by slugtree; documents and redirects belong to the
//! surrounding content platform and are reached only through these traits,
//! injected into the trigger and the handlers.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// JOB REPOSITORY
// =============================================================================

/// Repository for queued jobs.
///
/// Every operation is atomic with respect to the others.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Queue a job, replacing any pending job with the same
    /// `(job_type, related_document_id, target_locale)`.
    async fn enqueue(
        &self,
        job_type: JobType,
        target: JobTarget,
        payload: Option<JsonValue>,
    ) -> Result<Job>;

    /// Oldest pending job of `job_type`, in insertion order.
    async fn get_next(&self, job_type: JobType) -> Result<Option<Job>>;

    /// Atomically claim the oldest pending job of `job_type` that is
    /// unclaimed or whose lease has expired.
    async fn claim_next(
        &self,
        job_type: JobType,
        lease_owner: &str,
        lease: Duration,
    ) -> Result<Option<Job>>;

    /// Pending job for the given key, if any.
    async fn find_pending(
        &self,
        job_type: JobType,
        related_document_id: &str,
        target_locale: &str,
    ) -> Result<Option<Job>>;

    /// Set a job's state and error message, releasing any claim.
    /// Returns `false` if the job no longer exists.
    async fn update_status(&self, job_id: Uuid, state: JobState, error: Option<&str>)
        -> Result<bool>;

    /// Delete a job. Returns `false` if it was already gone.
    async fn remove(&self, job_id: Uuid) -> Result<bool>;

    /// Get job by ID.
    async fn get(&self, job_id: Uuid) -> Result<Option<Job>>;

    /// List jobs in insertion order.
    async fn list(&self, filter: JobFilter) -> Result<Vec<Job>>;

    /// Number of pending jobs, optionally of one type.
    async fn pending_count(&self, job_type: Option<JobType>) -> Result<u64>;

    /// Put failed jobs of `job_type` back into the queue.
    ///
    /// A failed job whose key already has a pending job is deleted instead.
    /// Returns the number of jobs made pending again.
    async fn requeue_failed(&self, job_type: JobType) -> Result<u64>;
}

// =============================================================================
// EXTERNAL STORES
// =============================================================================

/// Read/write access to hierarchical documents in the content store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Currently published version of a document, before any pending write
    /// is applied.
    async fn find_published(
        &self,
        document_type: &str,
        document_id: &str,
        locale: &str,
    ) -> Result<Option<Page>>;

    /// Published document with its parent and direct children.
    async fn find_with_relations(
        &self,
        document_type: &str,
        document_id: &str,
        locale: &str,
    ) -> Result<Option<PageWithRelations>>;

    /// Overwrite the published document's fullPath.
    async fn update_full_path(
        &self,
        document_type: &str,
        document_id: &str,
        locale: &str,
        full_path: &str,
        origin: WriteOrigin,
    ) -> Result<()>;
}

/// Sink for redirects.
#[async_trait]
pub trait RedirectStore: Send + Sync {
    /// Create a redirect in the published state.
    async fn create_published(&self, redirect: NewRedirect) -> Result<Redirect>;
}
