//! RecalculateFullPathHandler: recomputes a page's fullPath, cascades the
//! change to its children and keeps the paired redirect job in step.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use slugtree_core::{
    CreateRedirectPayload, DocumentStore, Job, JobRepository, JobTarget, JobType, PathNormalizer,
    Result, WriteOrigin,
};

use crate::handler::{JobContext, JobHandler, JobResult};

pub struct RecalculateFullPathHandler {
    documents: Arc<dyn DocumentStore>,
    jobs: Arc<dyn JobRepository>,
    paths: Arc<dyn PathNormalizer>,
}

impl RecalculateFullPathHandler {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        jobs: Arc<dyn JobRepository>,
        paths: Arc<dyn PathNormalizer>,
    ) -> Self {
        Self {
            documents,
            jobs,
            paths,
        }
    }

    async fn recalculate(&self, job: &Job) -> Result<JobResult> {
        let Some(found) = self
            .documents
            .find_with_relations(
                &job.document_type,
                &job.related_document_id,
                &job.target_locale,
            )
            .await?
        else {
            return Ok(JobResult::Skipped(format!(
                "document {} ({}) is not published",
                job.related_document_id, job.target_locale
            )));
        };

        let parent_path = found.parent.as_ref().and_then(|p| p.full_path.as_deref());
        let new_full_path = self
            .paths
            .normalize(&[parent_path, Some(found.page.slug.as_str())], None);
        let old_full_path = found.page.full_path.as_deref();

        if old_full_path != Some(new_full_path.as_str()) {
            self.documents
                .update_full_path(
                    &job.document_type,
                    &job.related_document_id,
                    &job.target_locale,
                    &new_full_path,
                    WriteOrigin::System,
                )
                .await?;

            // The queue is the call stack of the tree walk.
            for child in &found.children {
                let target = JobTarget::new(&job.document_type, &child.document_id, &child.locale)
                    .with_slug(&child.slug);
                self.jobs
                    .enqueue(JobType::RecalculateFullPath, target, None)
                    .await?;
            }

            info!(
                subsystem = "jobs",
                component = "recalculate",
                op = "update_full_path",
                document_id = %job.related_document_id,
                locale = %job.target_locale,
                old_path = old_full_path.unwrap_or_default(),
                new_path = %new_full_path,
                child_count = found.children.len(),
                "fullPath updated"
            );
        } else {
            debug!(
                subsystem = "jobs",
                component = "recalculate",
                op = "update_full_path",
                document_id = %job.related_document_id,
                new_path = %new_full_path,
                "fullPath unchanged"
            );
        }

        self.rebase_redirect(job, &found.page.slug, old_full_path, &new_full_path)
            .await?;

        Ok(JobResult::Success)
    }

    /// Keep at most one pending redirect per page, pointing from the oldest
    /// unmaterialized path to the current one.
    ///
    /// A pending redirect's `oldPath` wins over the stored path, so
    /// A -> B -> A collapses to nothing and A -> B -> C yields a single
    /// A -> C redirect.
    async fn rebase_redirect(
        &self,
        job: &Job,
        slug: &str,
        old_full_path: Option<&str>,
        new_full_path: &str,
    ) -> Result<()> {
        let pending = self
            .jobs
            .find_pending(
                JobType::CreateRedirect,
                &job.related_document_id,
                &job.target_locale,
            )
            .await?;

        let pending_old_path = match &pending {
            Some(pending) => pending.redirect_payload()?.map(|p| p.old_path),
            None => None,
        };
        let effective_old = pending_old_path
            .or_else(|| old_full_path.map(String::from))
            .filter(|p| !p.is_empty());

        let locale = Some(job.target_locale.as_str());
        let paths = effective_old.map(|old| {
            (
                self.paths.normalize(&[Some(old.as_str())], locale),
                self.paths.normalize(&[Some(new_full_path)], locale),
            )
        });

        match paths {
            Some((old_path, new_path)) if old_path != new_path => {
                if let Some(pending) = &pending {
                    self.jobs.remove(pending.id).await?;
                }
                let payload = CreateRedirectPayload::new(&old_path, &new_path);
                let target = JobTarget::new(
                    &job.document_type,
                    &job.related_document_id,
                    &job.target_locale,
                )
                .with_slug(slug);
                self.jobs
                    .enqueue(JobType::CreateRedirect, target, Some(payload.to_json()?))
                    .await?;

                debug!(
                    subsystem = "jobs",
                    component = "recalculate",
                    op = "rebase_redirect",
                    document_id = %job.related_document_id,
                    old_path = %old_path,
                    new_path = %new_path,
                    replaced = pending.is_some(),
                    "Redirect queued"
                );
            }
            _ => {
                if let Some(pending) = pending {
                    self.jobs.remove(pending.id).await?;
                    debug!(
                        subsystem = "jobs",
                        component = "recalculate",
                        op = "rebase_redirect",
                        document_id = %job.related_document_id,
                        job_id = %pending.id,
                        "Pending redirect dropped, path is back where it started"
                    );
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl JobHandler for RecalculateFullPathHandler {
    fn job_type(&self) -> JobType {
        JobType::RecalculateFullPath
    }

    #[instrument(
        skip(self, ctx),
        fields(
            subsystem = "jobs",
            component = "recalculate",
            job_id = %ctx.job.id,
            document_id = %ctx.job.related_document_id,
            locale = %ctx.job.target_locale,
        )
    )]
    async fn execute(&self, ctx: JobContext) -> JobResult {
        if !self.can_handle(ctx.job.job_type) {
            return JobResult::Skipped(format!("not a {} job", self.job_type()));
        }

        let start = Instant::now();
        match self.recalculate(&ctx.job).await {
            Ok(result) => {
                debug!(
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Recalculation finished"
                );
                result
            }
            Err(e) => {
                warn!(error = %e, "Recalculation failed");
                JobResult::Failed(e.to_string())
            }
        }
    }
}
