//! Job orchestration -- assembly, snapshot wiring, and lifecycle management.
//!
//! The [`Orchestrator`] is the central coordinator of `weblog-daemon`.
//! It validates configuration, builds one `LogPipeline` per `[[jobs]]`
//! entry, routes every job snapshot to the publisher, and runs until a
//! shutdown signal arrives.
//!
//! # Data flow
//!
//! ```text
//! job pipelines --JobSnapshot--> publisher --> weblog_snapshot_value{job,key} gauges
//!       |
//!   Logger (rate limited) <-- MsgCountWatcher (shared, zeroes counters every reset interval)
//! ```
//!
//! # Shutdown
//!
//! 1. Broadcast shutdown to background tasks (publisher, uptime updater)
//! 2. Stop jobs in reverse order (in-flight ticks are dropped)
//! 3. Stop the message-count watcher

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use weblog_core::config::WeblogConfig;
use weblog_core::logger::MsgCountWatcher;
use weblog_core::metrics as m;
use weblog_log_pipeline::JobSnapshot;

use crate::health::{DaemonHealth, JobHealth, aggregate_status};
use crate::metrics_server;
use crate::modules::{ModuleRegistry, log_pipeline};

/// Snapshot channel capacity shared by all jobs.
const SNAPSHOT_CHANNEL_CAPACITY: usize = 256;

/// Uptime gauge refresh interval.
const UPTIME_REFRESH: Duration = Duration::from_secs(10);

/// The main daemon orchestrator.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: WeblogConfig,
    /// Job pipelines in configuration order.
    modules: ModuleRegistry,
    /// Zeroes the per-job diagnostic message counters.
    watcher: Arc<MsgCountWatcher>,
    /// Receives snapshots from every job until `start` hands it to the publisher.
    snapshot_rx: Option<mpsc::Receiver<JobSnapshot>>,
    /// Shutdown broadcast sender (signals all background tasks).
    shutdown_tx: broadcast::Sender<()>,
    /// Background tasks spawned by `start`.
    tasks: Vec<JoinHandle<()>>,
    /// Daemon start time (for uptime reporting).
    start_time: Instant,
}

impl Orchestrator {
    /// Load configuration and build the orchestrator.
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = WeblogConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config).await
    }

    /// Build from an already-loaded configuration.
    ///
    /// Must be called inside a tokio runtime (the message-count watcher
    /// spawns its reset loop immediately).
    pub async fn build_from_config(config: WeblogConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
        }

        let watcher = Arc::new(MsgCountWatcher::new(Duration::from_secs(
            config.general.msg_reset_every_secs,
        )));
        let (snapshot_tx, snapshot_rx) = mpsc::channel(SNAPSHOT_CHANNEL_CAPACITY);
        let (shutdown_tx, _) = broadcast::channel(16);

        let mut modules = ModuleRegistry::new();
        for job in &config.jobs {
            let handle = log_pipeline::init(
                &config.general,
                job,
                snapshot_tx.clone(),
                Arc::clone(&watcher),
            )?;
            modules.register(handle)?;
        }

        tracing::info!(jobs = modules.count(), "orchestrator initialized");

        if config.metrics.enabled {
            #[allow(clippy::cast_precision_loss)]
            metrics::gauge!(m::DAEMON_JOBS_REGISTERED).set(modules.count() as f64);
        }

        Ok(Self {
            config,
            modules,
            watcher,
            snapshot_rx: Some(snapshot_rx),
            shutdown_tx,
            tasks: Vec::new(),
            start_time: Instant::now(),
        })
    }

    /// Start every job and the background tasks.
    ///
    /// On failure, jobs that already started are stopped again.
    pub async fn start(&mut self) -> Result<()> {
        let Some(snapshot_rx) = self.snapshot_rx.take() else {
            return Err(anyhow::anyhow!("orchestrator already started"));
        };

        if let Err(e) = self.modules.start_all().await {
            tracing::warn!("startup failed, rolling back already-started jobs");
            if let Err(stop_err) = self.modules.stop_all().await {
                tracing::error!(
                    startup_error = %e,
                    rollback_error = %stop_err,
                    "rollback also failed during startup failure cleanup"
                );
            }
            return Err(e);
        }

        self.tasks.push(spawn_snapshot_publisher(
            snapshot_rx,
            self.config.metrics.enabled,
            self.shutdown_tx.subscribe(),
        ));

        if self.config.metrics.enabled {
            self.tasks.push(spawn_uptime_updater(
                self.start_time,
                self.shutdown_tx.subscribe(),
            ));
        }

        tracing::info!(jobs = self.modules.enabled_count(), "all jobs started");
        Ok(())
    }

    /// Start, block until SIGTERM or SIGINT, then shut down.
    pub async fn run(&mut self) -> Result<()> {
        self.start().await?;

        let signal = wait_for_shutdown_signal().await?;
        tracing::info!(signal = signal, "shutdown signal received");

        self.shutdown().await
    }

    /// Stop background tasks, jobs, and the watcher.
    pub async fn shutdown(&mut self) -> Result<()> {
        let _ = self.shutdown_tx.send(());
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "background task ended abnormally");
            }
        }

        let result = self.modules.stop_all().await;
        self.watcher.stop().await;
        tracing::info!("weblog-daemon shut down");
        result
    }

    /// Current aggregated health status.
    pub async fn health(&self) -> DaemonHealth {
        let jobs: Vec<JobHealth> = self
            .modules
            .health_statuses()
            .await
            .into_iter()
            .map(|(name, enabled, status)| JobHealth {
                name,
                enabled,
                status,
            })
            .collect();

        DaemonHealth {
            status: aggregate_status(&jobs),
            uptime_secs: self.start_time.elapsed().as_secs(),
            jobs,
        }
    }

    /// The loaded configuration.
    pub fn config(&self) -> &WeblogConfig {
        &self.config
    }

    /// Number of registered jobs.
    pub fn job_count(&self) -> usize {
        self.modules.count()
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Publish one snapshot: a debug event with the sorted key set and,
/// when the exporter is installed, one gauge per key.
fn publish_snapshot(snapshot: &JobSnapshot, export: bool) {
    let sorted: BTreeMap<&str, i64> = snapshot
        .snapshot
        .iter()
        .map(|(k, v)| (k.as_str(), *v))
        .collect();

    match serde_json::to_string(&sorted) {
        Ok(json) => tracing::debug!(job = %snapshot.job, snapshot = %json, "job snapshot"),
        Err(e) => tracing::warn!(job = %snapshot.job, error = %e, "failed to encode snapshot"),
    }

    if export {
        for (key, value) in sorted {
            #[allow(clippy::cast_precision_loss)]
            metrics::gauge!(
                m::WEBLOG_SNAPSHOT_VALUE,
                m::LABEL_JOB => snapshot.job.clone(),
                m::LABEL_KEY => key.to_owned()
            )
            .set(value as f64);
        }
    }
}

/// Spawn the task that consumes job snapshots until shutdown or until
/// every job has dropped its sender.
fn spawn_snapshot_publisher(
    mut snapshot_rx: mpsc::Receiver<JobSnapshot>,
    export: bool,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                received = snapshot_rx.recv() => {
                    match received {
                        Some(snapshot) => publish_snapshot(&snapshot, export),
                        None => {
                            tracing::debug!("snapshot channel closed, exiting publisher");
                            break;
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::debug!("snapshot publisher shutting down");
                    break;
                }
            }
        }
    })
}

/// Spawn a background task that periodically updates the uptime metric.
fn spawn_uptime_updater(
    start_time: Instant,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(UPTIME_REFRESH);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    #[allow(clippy::cast_precision_loss)]
                    metrics::gauge!(m::DAEMON_UPTIME_SECONDS)
                        .set(start_time.elapsed().as_secs() as f64);
                }
                _ = shutdown_rx.recv() => {
                    tracing::debug!("uptime updater shutting down");
                    break;
                }
            }
        }
    })
}
