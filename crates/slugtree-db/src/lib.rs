//! # slugtree-db
//!
//! Storage layer for slugtree.
//!
//! This crate provides:
//! - Connection pool management
//! - A PostgreSQL job repository for multi-process deployments
//! - An in-memory job repository for single-process deployments and tests
//! - In-memory document and redirect stores that stand in for a content
//!   platform
//!
//! ## Example
//!
//! ```rust,ignore
//! use slugtree_db::{Database, JobRepository, JobTarget, JobType};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/slugtree").await?;
//!     db.migrate().await?;
//!
//!     let target = JobTarget::new("api::page.page", "doc-1", "en");
//!     db.jobs.enqueue(JobType::RecalculateFullPath, target, None).await?;
//!     Ok(())
//! }
//! ```
pub mod documents;
pub mod jobs;
pub mod memory;
pub mod pool;
pub mod test_fixtures;

// Re-export core types
pub use slugtree_core::*;

pub use documents::{FullPathWrite, MemoryDocumentStore, MemoryRedirectStore};
pub use jobs::PgJobRepository;
pub use memory::MemoryJobRepository;
pub use pool::PoolConfig;

/// PostgreSQL-backed storage.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Job repository for the fullPath and redirect queues.
    pub jobs: PgJobRepository,
}

impl Database {
    /// Create a new database instance from an existing pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            jobs: PgJobRepository::new(pool.clone()),
            pool,
        }
    }

    /// Connect to database with default pool settings.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_config(&PoolConfig::new(url)).await
    }

    /// Connect using `DATABASE_URL` and the other `DATABASE_*` variables.
    pub async fn from_env() -> Result<Self> {
        Self::connect_with_config(&PoolConfig::from_env()?).await
    }

    /// Connect with custom pool configuration.
    pub async fn connect_with_config(config: &PoolConfig) -> Result<Self> {
        let pool = pool::connect(config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
