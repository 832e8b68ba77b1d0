//! In-memory job repository.
//!
//! Backs single-process deployments and tests. All state sits behind one
//! `RwLock`, so every operation is atomic; an insertion sequence number
//! gives strict FIFO order independent of clock resolution.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use tokio::sync::{Notify, RwLock};
use tracing::{debug, trace};
use uuid::Uuid;

use slugtree_core::{Error, Job, JobFilter, JobRepository, JobState, JobTarget, JobType, Result};

#[derive(Debug, Default)]
struct MemoryJobState {
    /// Jobs keyed by insertion sequence (oldest first).
    jobs: BTreeMap<u64, Job>,
    /// Job id to sequence number.
    index: HashMap<Uuid, u64>,
    next_seq: u64,
}

impl MemoryJobState {
    fn insert(&mut self, job: Job) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.index.insert(job.id, seq);
        self.jobs.insert(seq, job);
    }

    fn remove(&mut self, id: &Uuid) -> Option<Job> {
        let seq = self.index.remove(id)?;
        self.jobs.remove(&seq)
    }

    fn get_mut(&mut self, id: &Uuid) -> Option<&mut Job> {
        let seq = self.index.get(id)?;
        self.jobs.get_mut(seq)
    }

    fn pending_with_key(&self, job_type: JobType, document_id: &str, locale: &str) -> Option<&Job> {
        self.jobs
            .values()
            .find(|j| j.is_pending() && j.has_key(job_type, document_id, locale))
    }
}

/// Job repository held entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryJobRepository {
    state: RwLock<MemoryJobState>,
    /// Notify handle for event-driven worker wake.
    notify: Arc<Notify>,
}

impl MemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository sharing an existing notify handle.
    pub fn with_notify(notify: Arc<Notify>) -> Self {
        Self {
            state: RwLock::new(MemoryJobState::default()),
            notify,
        }
    }

    /// Get the job notification handle for event-driven waking.
    pub fn job_notify(&self) -> Arc<Notify> {
        self.notify.clone()
    }
}

fn lease_to_chrono(lease: Duration) -> Result<chrono::Duration> {
    chrono::Duration::from_std(lease)
        .map_err(|e| Error::InvalidInput(format!("lease out of range: {e}")))
}

#[async_trait]
impl JobRepository for MemoryJobRepository {
    async fn enqueue(
        &self,
        job_type: JobType,
        target: JobTarget,
        payload: Option<JsonValue>,
    ) -> Result<Job> {
        target.validate()?;
        let job = Job::pending(job_type, target, payload);

        {
            let mut state = self.state.write().await;
            let existing = state
                .pending_with_key(job_type, &job.related_document_id, &job.target_locale)
                .map(|j| j.id);
            if let Some(existing) = existing {
                state.remove(&existing);
                debug!(
                    subsystem = "database",
                    component = "memory_jobs",
                    op = "enqueue",
                    job_id = %existing,
                    job_type = %job_type,
                    "Replaced pending job with the same key"
                );
            }
            state.insert(job.clone());
        }

        self.notify.notify_one();
        Ok(job)
    }

    async fn get_next(&self, job_type: JobType) -> Result<Option<Job>> {
        let state = self.state.read().await;
        Ok(state
            .jobs
            .values()
            .find(|j| j.job_type == job_type && j.is_pending())
            .cloned())
    }

    async fn claim_next(
        &self,
        job_type: JobType,
        lease_owner: &str,
        lease: Duration,
    ) -> Result<Option<Job>> {
        let lease = lease_to_chrono(lease)?;
        let now = Utc::now();

        let mut state = self.state.write().await;
        let claimed = state
            .jobs
            .values_mut()
            .find(|j| j.job_type == job_type && j.is_claimable(now))
            .map(|job| {
                job.claim(lease_owner, now, lease);
                job.clone()
            });

        if let Some(job) = &claimed {
            trace!(job_id = %job.id, job_type = %job_type, lease_owner, "Claimed job");
        }
        Ok(claimed)
    }

    async fn find_pending(
        &self,
        job_type: JobType,
        related_document_id: &str,
        target_locale: &str,
    ) -> Result<Option<Job>> {
        let state = self.state.read().await;
        Ok(state
            .pending_with_key(job_type, related_document_id, target_locale)
            .cloned())
    }

    async fn update_status(
        &self,
        job_id: Uuid,
        job_state: JobState,
        error: Option<&str>,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.get_mut(&job_id) {
            Some(job) => {
                job.state = job_state;
                job.error = error.map(String::from);
                job.release();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove(&self, job_id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        Ok(state.remove(&job_id).is_some())
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>> {
        let state = self.state.read().await;
        Ok(state
            .index
            .get(&job_id)
            .and_then(|seq| state.jobs.get(seq))
            .cloned())
    }

    async fn list(&self, filter: JobFilter) -> Result<Vec<Job>> {
        let state = self.state.read().await;
        Ok(state
            .jobs
            .values()
            .filter(|j| filter.matches(j))
            .cloned()
            .collect())
    }

    async fn pending_count(&self, job_type: Option<JobType>) -> Result<u64> {
        let state = self.state.read().await;
        let count = state
            .jobs
            .values()
            .filter(|j| j.is_pending() && job_type.map_or(true, |t| j.job_type == t))
            .count();
        Ok(count as u64)
    }

    async fn requeue_failed(&self, job_type: JobType) -> Result<u64> {
        let mut requeued = 0;
        {
            let mut state = self.state.write().await;
            // Newest first, so the most recent failure of a key is the one revived.
            let failed: Vec<Uuid> = state
                .jobs
                .values()
                .rev()
                .filter(|j| j.job_type == job_type && j.state == JobState::Failed)
                .map(|j| j.id)
                .collect();

            for id in failed {
                let key = state
                    .index
                    .get(&id)
                    .and_then(|seq| state.jobs.get(seq))
                    .map(|job| (job.related_document_id.clone(), job.target_locale.clone()));
                let Some((document_id, locale)) = key else {
                    continue;
                };

                if state.pending_with_key(job_type, &document_id, &locale).is_some() {
                    state.remove(&id);
                } else if let Some(job) = state.get_mut(&id) {
                    job.state = JobState::Pending;
                    job.error = None;
                    job.release();
                    requeued += 1;
                }
            }
        }

        if requeued > 0 {
            self.notify.notify_one();
        }
        Ok(requeued)
    }
}
