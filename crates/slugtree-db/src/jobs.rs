//! PostgreSQL job repository implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use sqlx::{Pool, Postgres, Row};
use tokio::sync::Notify;
use tracing::debug;
use uuid::Uuid;

use slugtree_core::{Error, Job, JobFilter, JobRepository, JobState, JobTarget, JobType, Result};

const JOB_COLUMNS: &str = "id, job_type, document_type, related_document_id, target_locale, slug, \
     payload, state, error, created_at, claimed_at, lease_owner, lease_expires_at";

/// PostgreSQL implementation of JobRepository.
///
/// Insertion order is the `seq` column; the partial unique index on
/// `(job_type, related_document_id, target_locale) WHERE state = 'pending'`
/// enforces coalescing at the schema level.
pub struct PgJobRepository {
    pool: Pool<Postgres>,
    /// Notify handle for event-driven worker wake.
    notify: Arc<Notify>,
}

impl PgJobRepository {
    /// Create a new PgJobRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            pool,
            notify: Arc::new(Notify::new()),
        }
    }

    /// Create a new PgJobRepository sharing an existing notify handle.
    pub fn with_notify(pool: Pool<Postgres>, notify: Arc<Notify>) -> Self {
        Self { pool, notify }
    }

    /// Get the job notification handle for event-driven waking.
    pub fn job_notify(&self) -> Arc<Notify> {
        self.notify.clone()
    }

    /// Parse a job row into a Job struct.
    fn parse_job_row(row: sqlx::postgres::PgRow) -> Result<Job> {
        let job_type: String = row.try_get("job_type")?;
        let state: String = row.try_get("state")?;
        Ok(Job {
            id: row.try_get("id")?,
            job_type: job_type.parse()?,
            document_type: row.try_get("document_type")?,
            related_document_id: row.try_get("related_document_id")?,
            target_locale: row.try_get("target_locale")?,
            slug: row.try_get("slug")?,
            payload: row.try_get("payload")?,
            state: state.parse()?,
            error: row.try_get("error")?,
            created_at: row.try_get("created_at")?,
            claimed_at: row.try_get("claimed_at")?,
            lease_owner: row.try_get("lease_owner")?,
            lease_expires_at: row.try_get("lease_expires_at")?,
        })
    }

    /// Advisory lock key serializing enqueues of one coalescing key.
    fn key_lock(job_type: JobType, related_document_id: &str, target_locale: &str) -> String {
        format!("{}:{}:{}", job_type.as_str(), related_document_id, target_locale)
    }
}

#[async_trait]
impl JobRepository for PgJobRepository {
    async fn enqueue(
        &self,
        job_type: JobType,
        target: JobTarget,
        payload: Option<JsonValue>,
    ) -> Result<Job> {
        target.validate()?;
        let job = Job::pending(job_type, target, payload);

        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(Self::key_lock(
                job_type,
                &job.related_document_id,
                &job.target_locale,
            ))
            .execute(&mut *tx)
            .await?;

        let replaced = sqlx::query(
            "DELETE FROM slugtree_jobs
             WHERE job_type = $1 AND related_document_id = $2 AND target_locale = $3
               AND state = 'pending'",
        )
        .bind(job_type.as_str())
        .bind(&job.related_document_id)
        .bind(&job.target_locale)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        sqlx::query(
            "INSERT INTO slugtree_jobs
                 (id, job_type, document_type, related_document_id, target_locale, slug,
                  payload, state, error, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', NULL, $8)",
        )
        .bind(job.id)
        .bind(job_type.as_str())
        .bind(&job.document_type)
        .bind(&job.related_document_id)
        .bind(&job.target_locale)
        .bind(&job.slug)
        .bind(&job.payload)
        .bind(job.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        if replaced > 0 {
            debug!(
                subsystem = "database",
                component = "pg_jobs",
                op = "enqueue",
                job_id = %job.id,
                job_type = %job_type,
                "Replaced pending job with the same key"
            );
        }
        self.notify.notify_one();
        Ok(job)
    }

    async fn get_next(&self, job_type: JobType) -> Result<Option<Job>> {
        let row = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM slugtree_jobs
             WHERE job_type = $1 AND state = 'pending'
             ORDER BY seq ASC
             LIMIT 1"
        ))
        .bind(job_type.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::parse_job_row).transpose()
    }

    async fn claim_next(
        &self,
        job_type: JobType,
        lease_owner: &str,
        lease: Duration,
    ) -> Result<Option<Job>> {
        let now = Utc::now();
        let lease = chrono::Duration::from_std(lease)
            .map_err(|e| Error::InvalidInput(format!("lease out of range: {e}")))?;

        // FOR UPDATE SKIP LOCKED keeps concurrent runners off each other's rows.
        let row = sqlx::query(&format!(
            "UPDATE slugtree_jobs
             SET claimed_at = $1, lease_owner = $2, lease_expires_at = $4
             WHERE seq = (
                 SELECT seq FROM slugtree_jobs
                 WHERE job_type = $3 AND state = 'pending'
                   AND (lease_expires_at IS NULL OR lease_expires_at <= $1)
                 ORDER BY seq ASC
                 LIMIT 1
                 FOR UPDATE SKIP LOCKED
             )
             RETURNING {JOB_COLUMNS}"
        ))
        .bind(now)
        .bind(lease_owner)
        .bind(job_type.as_str())
        .bind(now + lease)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::parse_job_row).transpose()
    }

    async fn find_pending(
        &self,
        job_type: JobType,
        related_document_id: &str,
        target_locale: &str,
    ) -> Result<Option<Job>> {
        let row = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM slugtree_jobs
             WHERE job_type = $1 AND related_document_id = $2 AND target_locale = $3
               AND state = 'pending'
             LIMIT 1"
        ))
        .bind(job_type.as_str())
        .bind(related_document_id)
        .bind(target_locale)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::parse_job_row).transpose()
    }

    async fn update_status(&self, job_id: Uuid, state: JobState, error: Option<&str>) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE slugtree_jobs
             SET state = $2, error = $3, claimed_at = NULL, lease_owner = NULL,
                 lease_expires_at = NULL
             WHERE id = $1",
        )
        .bind(job_id)
        .bind(state.as_str())
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove(&self, job_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM slugtree_jobs WHERE id = $1")
            .bind(job_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>> {
        let row = sqlx::query(&format!("SELECT {JOB_COLUMNS} FROM slugtree_jobs WHERE id = $1"))
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::parse_job_row).transpose()
    }

    async fn list(&self, filter: JobFilter) -> Result<Vec<Job>> {
        let rows = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM slugtree_jobs
             WHERE ($1::text IS NULL OR job_type = $1)
               AND ($2::text IS NULL OR state = $2)
             ORDER BY seq ASC"
        ))
        .bind(filter.job_type.map(|t| t.as_str()))
        .bind(filter.state.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::parse_job_row).collect()
    }

    async fn pending_count(&self, job_type: Option<JobType>) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM slugtree_jobs
             WHERE state = 'pending' AND ($1::text IS NULL OR job_type = $1)",
        )
        .bind(job_type.map(|t| t.as_str()))
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as u64)
    }

    async fn requeue_failed(&self, job_type: JobType) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        // Failed jobs whose key already has a pending job are superseded.
        sqlx::query(
            "DELETE FROM slugtree_jobs f
             WHERE f.job_type = $1 AND f.state = 'failed'
               AND EXISTS (
                   SELECT 1 FROM slugtree_jobs p
                   WHERE p.state = 'pending' AND p.job_type = f.job_type
                     AND p.related_document_id = f.related_document_id
                     AND p.target_locale = f.target_locale
               )",
        )
        .bind(job_type.as_str())
        .execute(&mut *tx)
        .await?;

        // Only the newest failure of a key is revived.
        sqlx::query(
            "DELETE FROM slugtree_jobs f
             WHERE f.job_type = $1 AND f.state = 'failed'
               AND EXISTS (
                   SELECT 1 FROM slugtree_jobs g
                   WHERE g.state = 'failed' AND g.job_type = f.job_type
                     AND g.related_document_id = f.related_document_id
                     AND g.target_locale = f.target_locale
                     AND g.seq > f.seq
               )",
        )
        .bind(job_type.as_str())
        .execute(&mut *tx)
        .await?;

        let requeued = sqlx::query(
            "UPDATE slugtree_jobs
             SET state = 'pending', error = NULL, claimed_at = NULL, lease_owner = NULL,
                 lease_expires_at = NULL
             WHERE job_type = $1 AND state = 'failed'",
        )
        .bind(job_type.as_str())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        if requeued > 0 {
            self.notify.notify_one();
        }
        Ok(requeued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_lock_is_stable() {
        assert_eq!(
            PgJobRepository::key_lock(JobType::CreateRedirect, "doc-1", "en"),
            "CREATE_REDIRECT:doc-1:en"
        );
    }

    #[test]
    fn test_job_columns_cover_job_fields() {
        for column in [
            "id",
            "job_type",
            "related_document_id",
            "payload",
            "claimed_at",
            "lease_owner",
            "lease_expires_at",
        ] {
            assert!(JOB_COLUMNS.contains(column), "missing column {column}");
        }
    }
}
