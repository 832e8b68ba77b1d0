//! Background worker that drains the job queue on a schedule.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, Notify};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use slugtree_core::{defaults, Error, JobType, Result};

use crate::runner::JobRunner;

/// Configuration for the job worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Polling interval in milliseconds.
    pub poll_interval_ms: u64,
    /// How long a claimed job stays exclusive to this worker, in seconds.
    pub lease_secs: u64,
    /// Identity recorded on claimed jobs.
    pub worker_id: String,
    /// Whether to enable job processing.
    pub enabled: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: defaults::JOB_POLL_INTERVAL_MS,
            lease_secs: defaults::JOB_LEASE_SECS,
            worker_id: defaults::JOB_WORKER_ID.to_string(),
            enabled: true,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `JOB_WORKER_ENABLED` | `true` | Enable/disable job processing |
    /// | `JOB_POLL_INTERVAL_MS` | `30000` | Delay between queue drains |
    /// | `JOB_LEASE_SECS` | `300` | Claim lease length |
    /// | `JOB_WORKER_ID` | `slugtree-worker` | Lease owner identity |
    pub fn from_env() -> Self {
        let enabled = std::env::var("JOB_WORKER_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let poll_interval_ms = std::env::var("JOB_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::JOB_POLL_INTERVAL_MS);

        let lease_secs = std::env::var("JOB_LEASE_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::JOB_LEASE_SECS)
            .max(1);

        let worker_id = std::env::var("JOB_WORKER_ID")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| defaults::JOB_WORKER_ID.to_string());

        Self {
            poll_interval_ms,
            lease_secs,
            worker_id,
            enabled,
        }
    }

    /// Create a new config with custom poll interval.
    pub fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set the claim lease length.
    pub fn with_lease_secs(mut self, secs: u64) -> Self {
        self.lease_secs = secs;
        self
    }

    /// Set the lease owner identity.
    pub fn with_worker_id(mut self, id: impl Into<String>) -> Self {
        self.worker_id = id.into();
        self
    }

    /// Enable or disable job processing.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Event emitted by the job runner and worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    /// A job was claimed and handed to its handler.
    JobStarted { job_id: Uuid, job_type: JobType },
    /// A job completed (or had nothing to do) and was removed.
    JobCompleted { job_id: Uuid, job_type: JobType },
    /// A job failed and was kept as `failed`.
    JobFailed {
        job_id: Uuid,
        job_type: JobType,
        error: String,
    },
    /// A `run_all` call emptied the queue for its type.
    RunFinished {
        job_type: JobType,
        succeeded: usize,
        failed: usize,
    },
    /// Worker started.
    WorkerStarted,
    /// Worker stopped.
    WorkerStopped,
}

/// Handle for controlling a running worker.
pub struct WorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
    event_rx: broadcast::Receiver<WorkerEvent>,
}

impl WorkerHandle {
    /// Signal the worker to shut down gracefully.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| Error::Internal("Failed to send shutdown signal".into()))?;
        Ok(())
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_rx.resubscribe()
    }
}

/// Drains every job type in turn, then waits for the next tick.
///
/// A tick is due when the poll interval elapses or, if a notify handle is
/// attached, as soon as a job is enqueued.
pub struct JobWorker {
    runner: Arc<JobRunner>,
    config: WorkerConfig,
    notify: Option<Arc<Notify>>,
    event_tx: broadcast::Sender<WorkerEvent>,
}

impl JobWorker {
    /// Create a new job worker.
    pub fn new(runner: JobRunner, config: WorkerConfig, notify: Option<Arc<Notify>>) -> Self {
        let runner = runner
            .with_lease_owner(config.worker_id.clone())
            .with_lease(Duration::from_secs(config.lease_secs));
        let event_tx = runner.event_sender();
        Self {
            runner: Arc::new(runner),
            config,
            notify,
            event_tx,
        }
    }

    pub fn runner(&self) -> &Arc<JobRunner> {
        &self.runner
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_tx.subscribe()
    }

    /// Start the worker and return a handle for control.
    pub fn start(self) -> WorkerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let event_rx = self.event_tx.subscribe();

        tokio::spawn(async move {
            self.run(&mut shutdown_rx).await;
        });

        WorkerHandle {
            shutdown_tx,
            event_rx,
        }
    }

    #[instrument(skip(self, shutdown_rx), fields(subsystem = "jobs", component = "worker"))]
    async fn run(&self, shutdown_rx: &mut mpsc::Receiver<()>) {
        if !self.config.enabled {
            info!("Job worker is disabled, not starting");
            return;
        }

        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            lease_secs = self.config.lease_secs,
            worker_id = %self.config.worker_id,
            "Job worker started"
        );
        let _ = self.event_tx.send(WorkerEvent::WorkerStarted);

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);

        loop {
            if shutdown_rx.try_recv().is_ok() {
                info!("Job worker received shutdown signal");
                break;
            }

            self.tick().await;

            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Job worker received shutdown signal");
                    break;
                }
                _ = sleep(poll_interval) => {}
                _ = Self::wait_for_enqueue(self.notify.as_deref()) => {
                    debug!("Woken by enqueue");
                }
            }
        }

        let _ = self.event_tx.send(WorkerEvent::WorkerStopped);
        info!("Job worker stopped");
    }

    /// Recalculations first, so the redirects they queue drain in the same
    /// tick.
    async fn tick(&self) {
        for job_type in JobType::ALL {
            if let Err(e) = self.runner.run_all(job_type).await {
                error!(job_type = %job_type, error = %e, "Job run failed");
            }
        }
    }

    async fn wait_for_enqueue(notify: Option<&Notify>) {
        match notify {
            Some(notify) => notify.notified().await,
            None => std::future::pending::<()>().await,
        }
    }
}

/// Builder for creating a job worker.
pub struct WorkerBuilder {
    runner: JobRunner,
    config: WorkerConfig,
    notify: Option<Arc<Notify>>,
}

impl WorkerBuilder {
    /// Create a new worker builder.
    pub fn new(runner: JobRunner) -> Self {
        Self {
            runner,
            config: WorkerConfig::default(),
            notify: None,
        }
    }

    /// Set the worker configuration.
    pub fn with_config(mut self, config: WorkerConfig) -> Self {
        self.config = config;
        self
    }

    /// Wake the worker whenever the job store signals an enqueue.
    pub fn with_notify(mut self, notify: Arc<Notify>) -> Self {
        self.notify = Some(notify);
        self
    }

    /// Build and return the worker.
    pub fn build(self) -> JobWorker {
        JobWorker::new(self.runner, self.config, self.notify)
    }
}
