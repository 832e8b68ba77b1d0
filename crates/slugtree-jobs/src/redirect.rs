//! CreateRedirectHandler: materializes a queued redirect.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use slugtree_core::{Job, JobType, NewRedirect, RedirectStore, Result};

use crate::handler::{JobContext, JobHandler, JobResult};

pub struct CreateRedirectHandler {
    redirects: Arc<dyn RedirectStore>,
}

impl CreateRedirectHandler {
    pub fn new(redirects: Arc<dyn RedirectStore>) -> Self {
        Self { redirects }
    }

    async fn create(&self, job: &Job) -> Result<JobResult> {
        let Some(payload) = job.redirect_payload()? else {
            return Ok(JobResult::Skipped("no redirect payload".to_string()));
        };

        let redirect = self
            .redirects
            .create_published(NewRedirect::from(&payload))
            .await?;

        info!(
            subsystem = "jobs",
            component = "redirect",
            op = "create",
            job_id = %job.id,
            document_id = %job.related_document_id,
            old_path = %redirect.source,
            new_path = %redirect.destination,
            "Redirect published"
        );
        Ok(JobResult::Success)
    }
}

#[async_trait]
impl JobHandler for CreateRedirectHandler {
    fn job_type(&self) -> JobType {
        JobType::CreateRedirect
    }

    #[instrument(skip(self, ctx), fields(subsystem = "jobs", component = "redirect", job_id = %ctx.job.id))]
    async fn execute(&self, ctx: JobContext) -> JobResult {
        if !self.can_handle(ctx.job.job_type) {
            return JobResult::Skipped(format!("not a {} job", self.job_type()));
        }

        match self.create(&ctx.job).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Redirect creation failed");
                JobResult::Failed(e.to_string())
            }
        }
    }
}
