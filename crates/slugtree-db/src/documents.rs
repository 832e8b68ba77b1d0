//! In-memory document and redirect stores.
//!
//! Stand-ins for the content platform's stores: they hold only the published
//! state of each page, which is all the job handlers read. Every fullPath
//! write is recorded so callers can assert on what the handlers touched.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use slugtree_core::{
    new_v7, DocumentStore, Error, NewRedirect, Page, PageRef, PageWithRelations, PageWrite,
    Redirect, RedirectStore, Result, WriteOrigin,
};

/// `(document_type, document_id, locale)`
type PageKey = (String, String, String);

fn key(document_type: &str, document_id: &str, locale: &str) -> PageKey {
    (
        document_type.to_string(),
        document_id.to_string(),
        locale.to_string(),
    )
}

/// A fullPath write observed by [`MemoryDocumentStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullPathWrite {
    pub document_type: String,
    pub document_id: String,
    pub locale: String,
    pub full_path: String,
    pub origin: WriteOrigin,
}

/// Published pages held in process memory.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    pages: RwLock<BTreeMap<PageKey, Page>>,
    writes: RwLock<Vec<FullPathWrite>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a published page.
    pub async fn put(&self, document_type: &str, page: Page) {
        let mut pages = self.pages.write().await;
        pages.insert(key(document_type, &page.document_id, &page.locale), page);
    }

    /// Apply a publish write to the published state.
    ///
    /// The published version takes the write's slug, parent and fullPath
    /// wholesale, the way a publish copies the draft.
    pub async fn apply(&self, document_type: &str, write: &PageWrite) -> Result<Page> {
        let document_id = write
            .document_id
            .as_deref()
            .ok_or_else(|| Error::InvalidInput("write has no document id".to_string()))?;

        let page = Page {
            document_id: document_id.to_string(),
            locale: write.locale.clone(),
            slug: write.slug.clone(),
            parent_id: write.parent_id.clone(),
            full_path: write.full_path.clone(),
        };
        self.put(document_type, page.clone()).await;
        Ok(page)
    }

    /// Unpublish a page.
    pub async fn remove(&self, document_type: &str, document_id: &str, locale: &str) -> Option<Page> {
        let mut pages = self.pages.write().await;
        pages.remove(&key(document_type, document_id, locale))
    }

    /// Published page, if any.
    pub async fn get(&self, document_type: &str, document_id: &str, locale: &str) -> Option<Page> {
        let pages = self.pages.read().await;
        pages.get(&key(document_type, document_id, locale)).cloned()
    }

    /// All fullPath writes made through [`DocumentStore::update_full_path`].
    pub async fn full_path_writes(&self) -> Vec<FullPathWrite> {
        self.writes.read().await.clone()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find_published(
        &self,
        document_type: &str,
        document_id: &str,
        locale: &str,
    ) -> Result<Option<Page>> {
        Ok(self.get(document_type, document_id, locale).await)
    }

    async fn find_with_relations(
        &self,
        document_type: &str,
        document_id: &str,
        locale: &str,
    ) -> Result<Option<PageWithRelations>> {
        let pages = self.pages.read().await;
        let Some(page) = pages.get(&key(document_type, document_id, locale)).cloned() else {
            return Ok(None);
        };

        let parent = page
            .parent_id
            .as_deref()
            .and_then(|parent_id| pages.get(&key(document_type, parent_id, locale)))
            .map(PageRef::from);

        let children = pages
            .iter()
            .filter(|((t, _, l), p)| {
                t == document_type && l == locale && p.parent_id.as_deref() == Some(document_id)
            })
            .map(|(_, p)| PageRef::from(p))
            .collect();

        Ok(Some(PageWithRelations {
            page,
            parent,
            children,
        }))
    }

    async fn update_full_path(
        &self,
        document_type: &str,
        document_id: &str,
        locale: &str,
        full_path: &str,
        origin: WriteOrigin,
    ) -> Result<()> {
        {
            let mut pages = self.pages.write().await;
            let page = pages
                .get_mut(&key(document_type, document_id, locale))
                .ok_or_else(|| Error::DocumentNotFound(document_id.to_string()))?;
            page.full_path = Some(full_path.to_string());
        }

        self.writes.write().await.push(FullPathWrite {
            document_type: document_type.to_string(),
            document_id: document_id.to_string(),
            locale: locale.to_string(),
            full_path: full_path.to_string(),
            origin,
        });
        Ok(())
    }
}

/// Published redirects held in process memory.
#[derive(Debug, Default)]
pub struct MemoryRedirectStore {
    redirects: RwLock<Vec<Redirect>>,
}

impl MemoryRedirectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All redirects, in creation order.
    pub async fn all(&self) -> Vec<Redirect> {
        self.redirects.read().await.clone()
    }
}

#[async_trait]
impl RedirectStore for MemoryRedirectStore {
    async fn create_published(&self, redirect: NewRedirect) -> Result<Redirect> {
        let redirect = Redirect {
            id: new_v7(),
            source: redirect.source,
            destination: redirect.destination,
            permanent: redirect.permanent,
            published_at: Utc::now(),
        };
        self.redirects.write().await.push(redirect.clone());
        Ok(redirect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "api::page.page";

    async fn tree() -> MemoryDocumentStore {
        let store = MemoryDocumentStore::new();
        store
            .put(PAGE, Page::new("root", "en", "/").with_full_path("/"))
            .await;
        store
            .put(
                PAGE,
                Page::new("about", "en", "about")
                    .with_parent("root")
                    .with_full_path("/about"),
            )
            .await;
        store
            .put(
                PAGE,
                Page::new("team", "en", "team")
                    .with_parent("about")
                    .with_full_path("/about/team"),
            )
            .await;
        store
            .put(
                PAGE,
                Page::new("about", "de", "ueber-uns")
                    .with_parent("root")
                    .with_full_path("/ueber-uns"),
            )
            .await;
        store
    }

    #[tokio::test]
    async fn test_find_with_relations_one_level() {
        let store = tree().await;
        let about = store
            .find_with_relations(PAGE, "about", "en")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(about.page.slug, "about");
        assert_eq!(about.parent.unwrap().full_path.as_deref(), Some("/"));
        assert_eq!(about.children.len(), 1);
        assert_eq!(about.children[0].document_id, "team");
    }

    #[tokio::test]
    async fn test_find_with_relations_stays_in_locale() {
        let store = tree().await;
        let root = store
            .find_with_relations(PAGE, "root", "en")
            .await
            .unwrap()
            .unwrap();
        assert!(root.parent.is_none());
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].locale, "en");
    }

    #[tokio::test]
    async fn test_find_missing_page() {
        let store = tree().await;
        assert!(store
            .find_with_relations(PAGE, "missing", "en")
            .await
            .unwrap()
            .is_none());
        assert!(store
            .find_published("api::article.article", "about", "en")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_update_full_path_records_write() {
        let store = tree().await;
        store
            .update_full_path(PAGE, "about", "en", "/about-us", WriteOrigin::System)
            .await
            .unwrap();

        let page = store.get(PAGE, "about", "en").await.unwrap();
        assert_eq!(page.full_path.as_deref(), Some("/about-us"));

        let writes = store.full_path_writes().await;
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].origin, WriteOrigin::System);
    }

    #[tokio::test]
    async fn test_update_full_path_missing_page() {
        let store = MemoryDocumentStore::new();
        let err = store
            .update_full_path(PAGE, "ghost", "en", "/ghost", WriteOrigin::System)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DocumentNotFound(_)));
        assert!(store.full_path_writes().await.is_empty());
    }

    #[tokio::test]
    async fn test_apply_publish_write() {
        let store = tree().await;
        let write = PageWrite::publish("about", "en", "about-us", WriteOrigin::user("1"))
            .with_parent("root")
            .with_full_path("/about");
        let page = store.apply(PAGE, &write).await.unwrap();

        assert_eq!(page.slug, "about-us");
        assert_eq!(page.full_path.as_deref(), Some("/about"));
        assert!(store
            .apply(PAGE, &PageWrite::new_draft("en", "x", WriteOrigin::user("1")))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_redirect_store_publishes() {
        let store = MemoryRedirectStore::new();
        let redirect = store
            .create_published(NewRedirect {
                source: "/about".to_string(),
                destination: "/about-us".to_string(),
                permanent: true,
            })
            .await
            .unwrap();

        assert!(redirect.permanent);
        assert_eq!(store.all().await, vec![redirect]);
    }
}
