//! Core data models for slugtree.
//!
//! These types are shared across all slugtree crates: the persisted job
//! record, the page and redirect views the handlers consume from external
//! stores, and the pending write the hierarchy trigger inspects.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::uuid_utils::new_v7;

// =============================================================================
// JOB TYPES
// =============================================================================

/// Type of job to process.
///
/// The set is closed: the runner dispatches on it with an exhaustive `match`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobType {
    /// Recompute a document's fullPath and cascade to its children
    #[serde(rename = "RECALCULATE_FULLPATH")]
    RecalculateFullPath,
    /// Materialize a queued redirect intent into a published redirect
    CreateRedirect,
}

impl JobType {
    /// Every job type, in the order a scheduler should drain them.
    pub const ALL: [JobType; 2] = [JobType::RecalculateFullPath, JobType::CreateRedirect];

    /// Wire/storage name of the job type.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::RecalculateFullPath => "RECALCULATE_FULLPATH",
            JobType::CreateRedirect => "CREATE_REDIRECT",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "RECALCULATE_FULLPATH" => Ok(JobType::RecalculateFullPath),
            "CREATE_REDIRECT" => Ok(JobType::CreateRedirect),
            other => Err(Error::InvalidInput(format!("unknown job type: {other}"))),
        }
    }
}

/// State of a stored job.
///
/// Successful jobs are deleted, so there is no terminal "completed" state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Failed => "failed",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(JobState::Pending),
            "failed" => Ok(JobState::Failed),
            other => Err(Error::InvalidInput(format!("unknown job state: {other}"))),
        }
    }
}

/// The document a job is about.
///
/// `(job_type, related_document_id, target_locale)` is the coalescing key:
/// at most one pending job exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobTarget {
    /// Collection the document lives in (e.g. `api::page.page`).
    pub document_type: String,
    pub related_document_id: String,
    pub target_locale: String,
    /// Display hint for operators; never used for lookups.
    pub slug: Option<String>,
}

impl JobTarget {
    pub fn new(
        document_type: impl Into<String>,
        related_document_id: impl Into<String>,
        target_locale: impl Into<String>,
    ) -> Self {
        Self {
            document_type: document_type.into(),
            related_document_id: related_document_id.into(),
            target_locale: target_locale.into(),
            slug: None,
        }
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    /// Reject targets missing any part of the coalescing key.
    pub fn validate(&self) -> Result<()> {
        if self.document_type.is_empty()
            || self.related_document_id.is_empty()
            || self.target_locale.is_empty()
        {
            return Err(Error::InvalidInput(
                "Missing required data to enqueue job".to_string(),
            ));
        }
        Ok(())
    }
}

/// A job in the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub job_type: JobType,
    pub document_type: String,
    pub related_document_id: String,
    pub target_locale: String,
    pub slug: Option<String>,
    pub payload: Option<JsonValue>,
    pub state: JobState,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    /// When a runner claimed the job. `None` means unclaimed.
    pub claimed_at: Option<DateTime<Utc>>,
    /// Identity of the runner holding the claim.
    pub lease_owner: Option<String>,
    /// End of the holder's lease, fixed at claim time.
    pub lease_expires_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Build a fresh, unclaimed pending job.
    pub fn pending(job_type: JobType, target: JobTarget, payload: Option<JsonValue>) -> Self {
        Self {
            id: new_v7(),
            job_type,
            document_type: target.document_type,
            related_document_id: target.related_document_id,
            target_locale: target.target_locale,
            slug: target.slug,
            payload,
            state: JobState::Pending,
            error: None,
            created_at: Utc::now(),
            claimed_at: None,
            lease_owner: None,
            lease_expires_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state == JobState::Pending
    }

    /// Whether this job shares the coalescing key.
    pub fn has_key(&self, job_type: JobType, related_document_id: &str, target_locale: &str) -> bool {
        self.job_type == job_type
            && self.related_document_id == related_document_id
            && self.target_locale == target_locale
    }

    /// Whether a runner may claim this job at `now`.
    ///
    /// A held claim stays exclusive until the lease recorded by its holder
    /// runs out, whatever lease the next claimant asks for.
    pub fn is_claimable(&self, now: DateTime<Utc>) -> bool {
        if !self.is_pending() {
            return false;
        }
        match self.lease_expires_at {
            None => true,
            Some(expires_at) => expires_at <= now,
        }
    }

    /// Stamp a claim by `lease_owner` lasting `lease` from `now`.
    pub fn claim(&mut self, lease_owner: &str, now: DateTime<Utc>, lease: Duration) {
        self.claimed_at = Some(now);
        self.lease_owner = Some(lease_owner.to_string());
        self.lease_expires_at = Some(now + lease);
    }

    /// Drop any claim on the job.
    pub fn release(&mut self) {
        self.claimed_at = None;
        self.lease_owner = None;
        self.lease_expires_at = None;
    }

    /// Decode the payload of a `CREATE_REDIRECT` job.
    ///
    /// Returns `Ok(None)` when there is no payload; a payload of the wrong
    /// shape is an error.
    pub fn redirect_payload(&self) -> Result<Option<CreateRedirectPayload>> {
        match &self.payload {
            None | Some(JsonValue::Null) => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
        }
    }
}

/// Payload of a `CREATE_REDIRECT` job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRedirectPayload {
    pub old_path: String,
    pub new_path: String,
}

impl CreateRedirectPayload {
    pub fn new(old_path: impl Into<String>, new_path: impl Into<String>) -> Self {
        Self {
            old_path: old_path.into(),
            new_path: new_path.into(),
        }
    }

    pub fn to_json(&self) -> Result<JsonValue> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Filter for listing jobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobFilter {
    pub job_type: Option<JobType>,
    pub state: Option<JobState>,
}

impl JobFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job_type(mut self, job_type: JobType) -> Self {
        self.job_type = Some(job_type);
        self
    }

    pub fn state(mut self, state: JobState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn matches(&self, job: &Job) -> bool {
        self.job_type.map_or(true, |t| job.job_type == t)
            && self.state.map_or(true, |s| job.state == s)
    }
}

/// Outcome of draining one job type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub successful_jobs: Vec<Uuid>,
    pub failed_jobs: Vec<Uuid>,
}

impl RunSummary {
    /// Total number of jobs the run processed.
    pub fn total(&self) -> usize {
        self.successful_jobs.len() + self.failed_jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

// =============================================================================
// PAGE TYPES
// =============================================================================

/// Draft/publish state a write targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicationStatus {
    Draft,
    Published,
}

/// Who caused a document write.
///
/// The hierarchy trigger ignores `System` writes, which is how the
/// recalculation handler's own `fullPath` updates avoid re-triggering it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum WriteOrigin {
    /// A human or an external integration, identified by its principal.
    User(String),
    /// slugtree itself.
    System,
}

impl WriteOrigin {
    pub fn user(id: impl Into<String>) -> Self {
        WriteOrigin::User(id.into())
    }

    pub fn is_system(&self) -> bool {
        matches!(self, WriteOrigin::System)
    }
}

/// Published state of a hierarchical document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub document_id: String,
    pub locale: String,
    pub slug: String,
    pub parent_id: Option<String>,
    pub full_path: Option<String>,
}

impl Page {
    pub fn new(
        document_id: impl Into<String>,
        locale: impl Into<String>,
        slug: impl Into<String>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            locale: locale.into(),
            slug: slug.into(),
            parent_id: None,
            full_path: None,
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_full_path(mut self, full_path: impl Into<String>) -> Self {
        self.full_path = Some(full_path.into());
        self
    }
}

/// One-level view of a related page (parent or child).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRef {
    pub document_id: String,
    pub locale: String,
    pub slug: String,
    pub full_path: Option<String>,
}

impl From<&Page> for PageRef {
    fn from(page: &Page) -> Self {
        Self {
            document_id: page.document_id.clone(),
            locale: page.locale.clone(),
            slug: page.slug.clone(),
            full_path: page.full_path.clone(),
        }
    }
}

/// A page with its parent and direct children populated one level deep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageWithRelations {
    pub page: Page,
    pub parent: Option<PageRef>,
    pub children: Vec<PageRef>,
}

/// A pending write as seen by the pre-write hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageWrite {
    /// Absent for the very first draft of a document.
    pub document_id: Option<String>,
    pub locale: String,
    pub slug: String,
    pub parent_id: Option<String>,
    pub full_path: Option<String>,
    pub status: PublicationStatus,
    pub origin: WriteOrigin,
}

impl PageWrite {
    /// A user publishing an existing document.
    pub fn publish(
        document_id: impl Into<String>,
        locale: impl Into<String>,
        slug: impl Into<String>,
        origin: WriteOrigin,
    ) -> Self {
        Self {
            document_id: Some(document_id.into()),
            locale: locale.into(),
            slug: slug.into(),
            parent_id: None,
            full_path: None,
            status: PublicationStatus::Published,
            origin,
        }
    }

    /// A first draft that has no identity yet.
    pub fn new_draft(locale: impl Into<String>, slug: impl Into<String>, origin: WriteOrigin) -> Self {
        Self {
            document_id: None,
            locale: locale.into(),
            slug: slug.into(),
            parent_id: None,
            full_path: None,
            status: PublicationStatus::Draft,
            origin,
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_full_path(mut self, full_path: impl Into<String>) -> Self {
        self.full_path = Some(full_path.into());
        self
    }

    /// Whether the write already carries a non-empty fullPath.
    pub fn has_full_path(&self) -> bool {
        self.full_path.as_deref().is_some_and(|p| !p.is_empty())
    }
}

// =============================================================================
// REDIRECT TYPES
// =============================================================================

/// Request to create a redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRedirect {
    pub source: String,
    pub destination: String,
    pub permanent: bool,
}

impl From<&CreateRedirectPayload> for NewRedirect {
    fn from(payload: &CreateRedirectPayload) -> Self {
        Self {
            source: payload.old_path.clone(),
            destination: payload.new_path.clone(),
            permanent: true,
        }
    }
}

/// A published redirect record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    pub id: Uuid,
    pub source: String,
    pub destination: String,
    pub permanent: bool,
    pub published_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn target() -> JobTarget {
        JobTarget::new("api::page.page", "doc-1", "en").with_slug("about")
    }

    #[test]
    fn test_job_type_wire_names() {
        assert_eq!(
            serde_json::to_value(JobType::RecalculateFullPath).unwrap(),
            json!("RECALCULATE_FULLPATH")
        );
        assert_eq!(
            serde_json::to_value(JobType::CreateRedirect).unwrap(),
            json!("CREATE_REDIRECT")
        );
        assert_eq!(
            "CREATE_REDIRECT".parse::<JobType>().unwrap(),
            JobType::CreateRedirect
        );
        assert_eq!(JobType::RecalculateFullPath.to_string(), "RECALCULATE_FULLPATH");
    }

    #[test]
    fn test_job_type_unknown_is_invalid_input() {
        let err = "PURGE".parse::<JobType>().unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_job_state_parse() {
        assert_eq!("failed".parse::<JobState>().unwrap(), JobState::Failed);
        assert!("running".parse::<JobState>().is_err());
    }

    #[test]
    fn test_target_validate_rejects_missing_locale() {
        let missing_locale = JobTarget::new("api::page.page", "doc-1", "");
        assert!(matches!(missing_locale.validate(), Err(Error::InvalidInput(_))));
        assert!(target().validate().is_ok());
    }

    #[test]
    fn test_pending_job_from_target() {
        let job = Job::pending(JobType::RecalculateFullPath, target(), None);
        assert!(job.is_pending());
        assert_eq!(job.slug.as_deref(), Some("about"));
        assert!(job.has_key(JobType::RecalculateFullPath, "doc-1", "en"));
        assert!(!job.has_key(JobType::CreateRedirect, "doc-1", "en"));
        assert!(!job.has_key(JobType::RecalculateFullPath, "doc-1", "de"));
    }

    #[test]
    fn test_claimable_respects_holder_lease() {
        let now = Utc::now();
        let mut job = Job::pending(JobType::RecalculateFullPath, target(), None);
        assert!(job.is_claimable(now));

        job.claim("w1", now - Duration::seconds(10), Duration::seconds(600));
        assert_eq!(job.lease_owner.as_deref(), Some("w1"));
        assert_eq!(job.lease_expires_at, Some(now + Duration::seconds(590)));
        assert!(!job.is_claimable(now));
        assert!(!job.is_claimable(now + Duration::seconds(589)));
        assert!(job.is_claimable(now + Duration::seconds(590)));

        job.release();
        assert!(job.claimed_at.is_none());
        assert!(job.is_claimable(now));

        job.state = JobState::Failed;
        assert!(!job.is_claimable(now));
    }

    #[test]
    fn test_redirect_payload_uses_camel_case() {
        let payload = CreateRedirectPayload::new("/about", "/about-us");
        let value = payload.to_json().unwrap();
        assert_eq!(value, json!({"oldPath": "/about", "newPath": "/about-us"}));

        let job = Job::pending(JobType::CreateRedirect, target(), Some(value));
        assert_eq!(job.redirect_payload().unwrap(), Some(payload));
    }

    #[test]
    fn test_redirect_payload_missing_and_malformed() {
        let job = Job::pending(JobType::CreateRedirect, target(), None);
        assert_eq!(job.redirect_payload().unwrap(), None);

        let job = Job::pending(JobType::CreateRedirect, target(), Some(json!({"old": 1})));
        assert!(matches!(job.redirect_payload(), Err(Error::Serialization(_))));
    }

    #[test]
    fn test_job_filter_matches() {
        let job = Job::pending(JobType::CreateRedirect, target(), None);
        assert!(JobFilter::new().matches(&job));
        assert!(JobFilter::new().job_type(JobType::CreateRedirect).matches(&job));
        assert!(!JobFilter::new().state(JobState::Failed).matches(&job));
    }

    #[test]
    fn test_write_origin_serde() {
        assert_eq!(
            serde_json::to_value(WriteOrigin::user("42")).unwrap(),
            json!({"kind": "user", "id": "42"})
        );
        assert_eq!(
            serde_json::to_value(WriteOrigin::System).unwrap(),
            json!({"kind": "system"})
        );
        assert!(WriteOrigin::System.is_system());
    }

    #[test]
    fn test_page_write_has_full_path() {
        let write = PageWrite::publish("doc-1", "en", "about", WriteOrigin::user("1"));
        assert!(!write.has_full_path());
        assert!(!write.clone().with_full_path("").has_full_path());
        assert!(write.with_full_path("/about").has_full_path());
    }

    #[test]
    fn test_new_redirect_from_payload_is_permanent() {
        let redirect = NewRedirect::from(&CreateRedirectPayload::new("/a", "/b"));
        assert_eq!(redirect.source, "/a");
        assert_eq!(redirect.destination, "/b");
        assert!(redirect.permanent);
    }

    #[test]
    fn test_run_summary_total() {
        let summary = RunSummary {
            successful_jobs: vec![Uuid::nil(), Uuid::nil()],
            failed_jobs: vec![Uuid::nil()],
        };
        assert_eq!(summary.total(), 3);
        assert!(RunSummary::default().is_empty());
    }
}
