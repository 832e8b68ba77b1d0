//! Shared fixture: an in-memory site with a page tree, wired to the trigger
//! and the runner the way a content platform would wire them.

#![allow(dead_code)]

use std::sync::Arc;

use slugtree_db::{MemoryDocumentStore, MemoryJobRepository, MemoryRedirectStore};
use slugtree_jobs::{
    DocumentStore, HierarchyConfig, HierarchyTrigger, Job, JobRepository, JobRunner, JobType,
    Page, PageWrite, Result, RunSummary, WriteOrigin,
};

pub const PAGE: &str = "api::page.page";
pub const LOCALE: &str = "en";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub struct Site {
    pub config: HierarchyConfig,
    pub documents: Arc<MemoryDocumentStore>,
    pub jobs: Arc<MemoryJobRepository>,
    pub redirects: Arc<MemoryRedirectStore>,
    pub trigger: HierarchyTrigger,
    pub runner: JobRunner,
}

impl Site {
    pub fn new() -> Self {
        Self::with_documents(Arc::new(MemoryDocumentStore::new()), None)
    }

    /// Site whose handlers read documents through `handler_documents`
    /// instead of the plain store.
    pub fn with_documents(
        documents: Arc<MemoryDocumentStore>,
        handler_documents: Option<Arc<dyn DocumentStore>>,
    ) -> Self {
        init_tracing();

        let config = HierarchyConfig::default().with_default_locale(LOCALE);
        let jobs = Arc::new(MemoryJobRepository::new());
        let redirects = Arc::new(MemoryRedirectStore::new());
        let trigger = HierarchyTrigger::new(config.clone(), documents.clone(), jobs.clone());
        let runner = JobRunner::new(
            jobs.clone(),
            handler_documents.unwrap_or_else(|| documents.clone() as Arc<dyn DocumentStore>),
            redirects.clone(),
            Arc::new(config.path_normalizer()),
        );

        Self {
            config,
            documents,
            jobs,
            redirects,
            trigger,
            runner,
        }
    }

    /// Seed the root page.
    pub async fn root(&self) {
        self.documents
            .put(PAGE, Page::new("root", LOCALE, "/").with_full_path("/"))
            .await;
    }

    /// Seed a published page with an already computed fullPath.
    pub async fn page(&self, id: &str, slug: &str, parent: &str, full_path: &str) {
        self.documents
            .put(
                PAGE,
                Page::new(id, LOCALE, slug)
                    .with_parent(parent)
                    .with_full_path(full_path),
            )
            .await;
    }

    /// Publish a page as an editor would: the write carries the fullPath
    /// currently stored, the trigger runs first and may reject the write.
    pub async fn publish(&self, id: &str, slug: &str, parent: Option<&str>) -> Result<Option<Job>> {
        let current = self.documents.get(PAGE, id, LOCALE).await;

        let mut write = PageWrite::publish(id, LOCALE, slug, WriteOrigin::user("editor-1"));
        write.parent_id = parent.map(String::from);
        write.full_path = current.and_then(|p| p.full_path);

        let job = self.trigger.before_publish(&write, PAGE).await?;
        self.documents.apply(PAGE, &write).await?;
        Ok(job)
    }

    pub async fn recalculate(&self) -> RunSummary {
        self.runner
            .run_all(JobType::RecalculateFullPath)
            .await
            .expect("job store available")
    }

    pub async fn create_redirects(&self) -> RunSummary {
        self.runner
            .run_all(JobType::CreateRedirect)
            .await
            .expect("job store available")
    }

    pub async fn full_path(&self, id: &str) -> Option<String> {
        self.documents
            .get(PAGE, id, LOCALE)
            .await
            .and_then(|p| p.full_path)
    }

    /// Published redirects as `(source, destination)` pairs.
    pub async fn redirect_pairs(&self) -> Vec<(String, String)> {
        self.redirects
            .all()
            .await
            .into_iter()
            .map(|r| (r.source, r.destination))
            .collect()
    }

    pub async fn pending(&self, job_type: JobType) -> u64 {
        self.jobs.pending_count(Some(job_type)).await.unwrap()
    }
}
