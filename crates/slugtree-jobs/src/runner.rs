//! Job runner: drains the queue for one job type.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};

use slugtree_core::defaults;
use slugtree_core::{
    DocumentStore, Job, JobRepository, JobState, JobType, PathNormalizer, RedirectStore, Result,
    RunSummary,
};

use crate::handler::{JobContext, JobHandler, JobResult};
use crate::recalculate::RecalculateFullPathHandler;
use crate::redirect::CreateRedirectHandler;
use crate::worker::WorkerEvent;

/// Processes queued jobs one at a time.
///
/// Each job is claimed under a lease, so several runners can share one
/// queue without processing the same job twice.
pub struct JobRunner {
    jobs: Arc<dyn JobRepository>,
    recalculate: RecalculateFullPathHandler,
    redirect: CreateRedirectHandler,
    lease_owner: String,
    lease: Duration,
    event_tx: broadcast::Sender<WorkerEvent>,
}

impl JobRunner {
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        documents: Arc<dyn DocumentStore>,
        redirects: Arc<dyn RedirectStore>,
        paths: Arc<dyn PathNormalizer>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(defaults::EVENT_BUS_CAPACITY);
        Self {
            recalculate: RecalculateFullPathHandler::new(documents, jobs.clone(), paths),
            redirect: CreateRedirectHandler::new(redirects),
            jobs,
            lease_owner: defaults::JOB_WORKER_ID.to_string(),
            lease: Duration::from_secs(defaults::JOB_LEASE_SECS),
            event_tx,
        }
    }

    /// Identity recorded on claimed jobs.
    pub fn with_lease_owner(mut self, owner: impl Into<String>) -> Self {
        self.lease_owner = owner.into();
        self
    }

    /// How long a claim stays exclusive.
    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    pub fn lease_owner(&self) -> &str {
        &self.lease_owner
    }

    pub fn jobs(&self) -> &Arc<dyn JobRepository> {
        &self.jobs
    }

    /// Get a receiver for job events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_tx.subscribe()
    }

    pub(crate) fn event_sender(&self) -> broadcast::Sender<WorkerEvent> {
        self.event_tx.clone()
    }

    /// Process every pending job of `job_type` until none is left.
    ///
    /// Jobs the handlers enqueue for the same type while the run is in
    /// progress are picked up by the same run. A failing job is marked
    /// `failed` and the run moves on. Errors from the job store itself are
    /// returned, since no outcome could be recorded.
    #[instrument(skip(self, job_type), fields(subsystem = "jobs", component = "runner", job_type = %job_type))]
    pub async fn run_all(&self, job_type: JobType) -> Result<RunSummary> {
        let start = Instant::now();
        let mut summary = RunSummary::default();

        while let Some(job) = self
            .jobs
            .claim_next(job_type, &self.lease_owner, self.lease)
            .await?
        {
            let job_id = job.id;
            let _ = self
                .event_tx
                .send(WorkerEvent::JobStarted { job_id, job_type });

            let job_start = Instant::now();
            match self.dispatch(job).await {
                result @ (JobResult::Success | JobResult::Skipped(_)) => {
                    self.jobs.remove(job_id).await?;
                    if let JobResult::Skipped(reason) = &result {
                        debug!(job_id = %job_id, %reason, "Job skipped");
                    }
                    info!(
                        job_id = %job_id,
                        duration_ms = job_start.elapsed().as_millis() as u64,
                        "Job completed"
                    );
                    summary.successful_jobs.push(job_id);
                    let _ = self
                        .event_tx
                        .send(WorkerEvent::JobCompleted { job_id, job_type });
                }
                JobResult::Failed(error) => {
                    if !self
                        .jobs
                        .update_status(job_id, JobState::Failed, Some(&error))
                        .await?
                    {
                        // Superseded by a newer enqueue for the same key.
                        debug!(job_id = %job_id, "Failed job already replaced");
                    }
                    warn!(
                        job_id = %job_id,
                        %error,
                        duration_ms = job_start.elapsed().as_millis() as u64,
                        "Job failed"
                    );
                    summary.failed_jobs.push(job_id);
                    let _ = self.event_tx.send(WorkerEvent::JobFailed {
                        job_id,
                        job_type,
                        error,
                    });
                }
            }
        }

        if !summary.is_empty() {
            info!(
                succeeded = summary.successful_jobs.len(),
                failed = summary.failed_jobs.len(),
                duration_ms = start.elapsed().as_millis() as u64,
                "Run finished"
            );
        }
        let _ = self.event_tx.send(WorkerEvent::RunFinished {
            job_type,
            succeeded: summary.successful_jobs.len(),
            failed: summary.failed_jobs.len(),
        });
        Ok(summary)
    }

    /// Drain every job type, in [`JobType::ALL`] order.
    ///
    /// Stops at the first job store error.
    pub async fn run_pending(&self) -> Result<Vec<(JobType, RunSummary)>> {
        let mut summaries = Vec::with_capacity(JobType::ALL.len());
        for job_type in JobType::ALL {
            match self.run_all(job_type).await {
                Ok(summary) => summaries.push((job_type, summary)),
                Err(e) => {
                    error!(
                        subsystem = "jobs",
                        component = "runner",
                        job_type = %job_type,
                        error = %e,
                        "Job store unavailable"
                    );
                    return Err(e);
                }
            }
        }
        Ok(summaries)
    }

    async fn dispatch(&self, job: Job) -> JobResult {
        let ctx = JobContext::new(job);
        match ctx.job.job_type {
            JobType::RecalculateFullPath => self.recalculate.execute(ctx).await,
            JobType::CreateRedirect => self.redirect.execute(ctx).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use slugtree_core::{DefaultPathNormalizer, JobFilter, JobTarget, Page};
    use slugtree_db::{MemoryDocumentStore, MemoryJobRepository, MemoryRedirectStore};

    const PAGE: &str = "api::page.page";

    struct Fixture {
        documents: Arc<MemoryDocumentStore>,
        jobs: Arc<MemoryJobRepository>,
        redirects: Arc<MemoryRedirectStore>,
        runner: JobRunner,
    }

    fn fixture() -> Fixture {
        let documents = Arc::new(MemoryDocumentStore::new());
        let jobs = Arc::new(MemoryJobRepository::new());
        let redirects = Arc::new(MemoryRedirectStore::new());
        let runner = JobRunner::new(
            jobs.clone(),
            documents.clone(),
            redirects.clone(),
            Arc::new(DefaultPathNormalizer::new()),
        );
        Fixture {
            documents,
            jobs,
            redirects,
            runner,
        }
    }

    #[tokio::test]
    async fn test_run_all_on_empty_queue() {
        let f = fixture();
        let summary = f.runner.run_all(JobType::RecalculateFullPath).await.unwrap();
        assert!(summary.is_empty());
    }

    #[tokio::test]
    async fn test_successful_and_skipped_jobs_are_removed() {
        let f = fixture();
        f.documents
            .put(PAGE, Page::new("root", "en", "/").with_full_path("/"))
            .await;
        for id in ["root", "ghost"] {
            f.jobs
                .enqueue(
                    JobType::RecalculateFullPath,
                    JobTarget::new(PAGE, id, "en"),
                    None,
                )
                .await
                .unwrap();
        }

        let summary = f.runner.run_all(JobType::RecalculateFullPath).await.unwrap();
        assert_eq!(summary.successful_jobs.len(), 2);
        assert!(summary.failed_jobs.is_empty());
        assert_eq!(f.jobs.pending_count(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_job_is_kept_with_error() {
        let f = fixture();
        let job = f
            .jobs
            .enqueue(
                JobType::CreateRedirect,
                JobTarget::new(PAGE, "about", "en"),
                Some(json!({"oldPath": 42})),
            )
            .await
            .unwrap();

        let summary = f.runner.run_all(JobType::CreateRedirect).await.unwrap();
        assert_eq!(summary.failed_jobs, vec![job.id]);

        let stored = f.jobs.get(job.id).await.unwrap().unwrap();
        assert_eq!(stored.state, JobState::Failed);
        assert!(stored.error.is_some());
        assert!(stored.lease_owner.is_none());
        assert!(f.redirects.all().await.is_empty());
    }

    #[tokio::test]
    async fn test_run_only_touches_requested_type() {
        let f = fixture();
        f.jobs
            .enqueue(
                JobType::CreateRedirect,
                JobTarget::new(PAGE, "about", "en"),
                Some(json!({"oldPath": "/a", "newPath": "/b"})),
            )
            .await
            .unwrap();

        let summary = f.runner.run_all(JobType::RecalculateFullPath).await.unwrap();
        assert!(summary.is_empty());
        assert_eq!(
            f.jobs
                .list(JobFilter::new().job_type(JobType::CreateRedirect))
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_events_are_published() {
        let f = fixture();
        let mut events = f.runner.events();
        let job = f
            .jobs
            .enqueue(
                JobType::CreateRedirect,
                JobTarget::new(PAGE, "about", "en"),
                Some(json!({"oldPath": "/a", "newPath": "/b"})),
            )
            .await
            .unwrap();

        f.runner.run_all(JobType::CreateRedirect).await.unwrap();

        assert!(matches!(
            events.recv().await.unwrap(),
            WorkerEvent::JobStarted { job_id, .. } if job_id == job.id
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            WorkerEvent::JobCompleted { job_id, .. } if job_id == job.id
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            WorkerEvent::RunFinished { succeeded: 1, failed: 0, .. }
        ));
    }

    #[tokio::test]
    async fn test_run_pending_drains_in_order() {
        let f = fixture();
        f.documents
            .put(PAGE, Page::new("root", "en", "/").with_full_path("/"))
            .await;
        f.documents
            .put(
                PAGE,
                Page::new("about", "en", "about-us")
                    .with_parent("root")
                    .with_full_path("/about"),
            )
            .await;
        f.jobs
            .enqueue(
                JobType::RecalculateFullPath,
                JobTarget::new(PAGE, "about", "en"),
                None,
            )
            .await
            .unwrap();

        let summaries = f.runner.run_pending().await.unwrap();
        assert_eq!(summaries[0].0, JobType::RecalculateFullPath);
        assert_eq!(summaries[0].1.successful_jobs.len(), 1);
        // The redirect queued by the recalculation is drained in the same pass.
        assert_eq!(summaries[1].1.successful_jobs.len(), 1);
        assert_eq!(f.redirects.all().await.len(), 1);
    }

    /// Document store that records the claim on the job being processed.
    struct ClaimObserver {
        inner: MemoryDocumentStore,
        jobs: Arc<MemoryJobRepository>,
        seen: tokio::sync::Mutex<Vec<Job>>,
    }

    #[async_trait::async_trait]
    impl DocumentStore for ClaimObserver {
        async fn find_published(
            &self,
            document_type: &str,
            document_id: &str,
            locale: &str,
        ) -> Result<Option<Page>> {
            self.inner.find_published(document_type, document_id, locale).await
        }

        async fn find_with_relations(
            &self,
            document_type: &str,
            document_id: &str,
            locale: &str,
        ) -> Result<Option<slugtree_core::PageWithRelations>> {
            let claimed = self
                .jobs
                .find_pending(JobType::RecalculateFullPath, document_id, locale)
                .await?;
            self.seen.lock().await.extend(claimed);
            self.inner
                .find_with_relations(document_type, document_id, locale)
                .await
        }

        async fn update_full_path(
            &self,
            document_type: &str,
            document_id: &str,
            locale: &str,
            full_path: &str,
            origin: slugtree_core::WriteOrigin,
        ) -> Result<()> {
            self.inner
                .update_full_path(document_type, document_id, locale, full_path, origin)
                .await
        }
    }

    #[tokio::test]
    async fn test_claimed_job_carries_lease_owner() {
        let jobs = Arc::new(MemoryJobRepository::new());
        let observer = Arc::new(ClaimObserver {
            inner: MemoryDocumentStore::new(),
            jobs: jobs.clone(),
            seen: tokio::sync::Mutex::new(Vec::new()),
        });
        observer
            .inner
            .put(PAGE, Page::new("root", "en", "/").with_full_path("/"))
            .await;
        let queued = jobs
            .enqueue(
                JobType::RecalculateFullPath,
                JobTarget::new(PAGE, "root", "en"),
                None,
            )
            .await
            .unwrap();

        let runner = JobRunner::new(
            jobs.clone(),
            observer.clone(),
            Arc::new(MemoryRedirectStore::new()),
            Arc::new(DefaultPathNormalizer::new()),
        )
        .with_lease_owner("worker-7")
        .with_lease(Duration::from_secs(60));
        assert_eq!(runner.lease_owner(), "worker-7");

        let summary = runner.run_all(JobType::RecalculateFullPath).await.unwrap();
        assert_eq!(summary.successful_jobs, vec![queued.id]);

        let seen = observer.seen.lock().await;
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].id, queued.id);
        assert_eq!(seen[0].lease_owner.as_deref(), Some("worker-7"));
        let claimed_at = seen[0].claimed_at.unwrap();
        let expires_at = seen[0].lease_expires_at.unwrap();
        assert_eq!((expires_at - claimed_at).num_seconds(), 60);
        drop(seen);
        assert!(jobs.get(queued.id).await.unwrap().is_none());
    }
}
