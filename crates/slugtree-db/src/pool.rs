//! PostgreSQL connection pool for the job store.

use std::str::FromStr;
use std::time::{Duration, Instant};

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Executor;
use tracing::info;

use slugtree_core::defaults;
use slugtree_core::{Error, Result};

/// Connection settings for the job store.
///
/// The queue issues short statements and one transaction per enqueue or
/// requeue, so a handful of connections serves several runners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    /// Schema searched before `public`, set on every new connection.
    pub schema: Option<String>,
}

impl PoolConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: defaults::DB_MAX_CONNECTIONS,
            acquire_timeout: Duration::from_secs(defaults::DB_ACQUIRE_TIMEOUT_SECS),
            schema: None,
        }
    }

    /// Create config from environment variables.
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `DATABASE_URL` | required | PostgreSQL connection string |
    /// | `DATABASE_MAX_CONNECTIONS` | `5` | Pool size |
    /// | `DATABASE_ACQUIRE_TIMEOUT_SECS` | `30` | Wait for a free connection |
    /// | `DATABASE_SCHEMA` | unset | Schema holding `slugtree_jobs` |
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| Error::Config("DATABASE_URL is not set".to_string()))?;

        let mut config = Self::new(database_url);
        if let Some(n) = env_parse("DATABASE_MAX_CONNECTIONS") {
            config.max_connections = n;
        }
        if let Some(secs) = env_parse("DATABASE_ACQUIRE_TIMEOUT_SECS") {
            config.acquire_timeout = Duration::from_secs(secs);
        }
        config.schema = std::env::var("DATABASE_SCHEMA")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        config.validate()?;
        Ok(config)
    }

    pub fn with_max_connections(mut self, n: u32) -> Self {
        self.max_connections = n;
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Put `schema` first on every connection's `search_path`.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Reject settings the pool cannot work with.
    ///
    /// The schema name is spliced into `SET search_path`, so only plain
    /// identifiers are accepted.
    pub fn validate(&self) -> Result<()> {
        if self.database_url.is_empty() {
            return Err(Error::Config("database URL is empty".to_string()));
        }
        if self.max_connections == 0 {
            return Err(Error::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if let Some(schema) = &self.schema {
            let plain = !schema.is_empty()
                && !schema.starts_with(|c: char| c.is_ascii_digit())
                && schema.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !plain {
                return Err(Error::Config(format!("invalid schema name: {schema:?}")));
            }
        }
        Ok(())
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Open a pool for `config`.
pub async fn connect(config: &PoolConfig) -> Result<PgPool> {
    config.validate()?;
    let start = Instant::now();

    let mut options = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout);

    if let Some(schema) = &config.schema {
        let set_search_path = format!("SET search_path TO {schema}, public");
        options = options.after_connect(move |conn, _meta| {
            let set_search_path = set_search_path.clone();
            Box::pin(async move {
                conn.execute(set_search_path.as_str()).await?;
                Ok(())
            })
        });
    }

    let pool = options.connect(&config.database_url).await?;

    info!(
        subsystem = "database",
        component = "pool",
        op = "connect",
        max_connections = config.max_connections,
        schema = config.schema.as_deref().unwrap_or("public"),
        duration_ms = start.elapsed().as_millis() as u64,
        "Job store pool ready"
    );
    Ok(pool)
}
