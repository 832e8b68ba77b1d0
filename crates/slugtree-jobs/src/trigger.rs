//! Pre-publish hook that decides whether a page's fullPath must be
//! recalculated.
//!
//! The trigger only enqueues. The recalculation itself can cascade through
//! an entire subtree, so it always runs later on the job runner.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use slugtree_core::{
    DocumentStore, Error, HierarchyConfig, Job, JobRepository, JobTarget, JobType, PageWrite,
    PublicationStatus, Result, ROOT_PAGE_PATH,
};

/// Message returned when a write tries to rename the root page.
pub const ROOT_SLUG_RESERVED: &str =
    "The slug '/' is reserved for the root page and cannot be changed.";

pub struct HierarchyTrigger {
    config: HierarchyConfig,
    documents: Arc<dyn DocumentStore>,
    jobs: Arc<dyn JobRepository>,
}

impl HierarchyTrigger {
    pub fn new(
        config: HierarchyConfig,
        documents: Arc<dyn DocumentStore>,
        jobs: Arc<dyn JobRepository>,
    ) -> Self {
        Self {
            config,
            documents,
            jobs,
        }
    }

    pub fn config(&self) -> &HierarchyConfig {
        &self.config
    }

    /// Inspect a write about to be published.
    ///
    /// Returns the queued `RECALCULATE_FULLPATH` job, or `None` when the
    /// write does not affect the page's position in the tree. Renaming the
    /// root page fails with [`Error::Validation`] and enqueues nothing; the
    /// caller is expected to reject the write.
    #[instrument(
        skip(self, write),
        fields(
            subsystem = "jobs",
            component = "trigger",
            document_id = write.document_id.as_deref().unwrap_or_default(),
            locale = %write.locale,
        )
    )]
    pub async fn before_publish(
        &self,
        write: &PageWrite,
        document_type: &str,
    ) -> Result<Option<Job>> {
        if !self.config.enabled || !self.config.is_hierarchical(document_type) {
            return Ok(None);
        }
        if write.status != PublicationStatus::Published {
            return Ok(None);
        }
        let Some(document_id) = write.document_id.as_deref() else {
            return Ok(None);
        };
        if write.origin.is_system() {
            debug!("Ignoring system write");
            return Ok(None);
        }

        let published = self
            .documents
            .find_published(document_type, document_id, &write.locale)
            .await?;

        let was_slug_changed = published.as_ref().is_some_and(|p| p.slug != write.slug);
        let was_parent_changed = published
            .as_ref()
            .is_some_and(|p| p.parent_id != write.parent_id);
        let needs_seed = !write.has_full_path();

        if !was_slug_changed && !was_parent_changed && !needs_seed {
            return Ok(None);
        }

        if was_slug_changed && published.as_ref().is_some_and(|p| p.slug == ROOT_PAGE_PATH) {
            return Err(Error::Validation(ROOT_SLUG_RESERVED.to_string()));
        }

        let target =
            JobTarget::new(document_type, document_id, &write.locale).with_slug(&write.slug);
        let job = self
            .jobs
            .enqueue(JobType::RecalculateFullPath, target, None)
            .await?;

        info!(
            job_id = %job.id,
            slug_changed = was_slug_changed,
            parent_changed = was_parent_changed,
            needs_seed,
            "fullPath recalculation queued"
        );
        Ok(Some(job))
    }
}
