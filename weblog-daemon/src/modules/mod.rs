//! Job registry.
//!
//! Each configured job is wrapped as a [`ModuleHandle`] that provides
//! uniform lifecycle management via the [`DynPipeline`] trait.

pub mod log_pipeline;

use weblog_core::pipeline::{DynPipeline, HealthStatus};

/// A handle to a registered job pipeline.
pub struct ModuleHandle {
    /// Job name for logging and health reporting.
    pub name: String,
    /// Whether this job is started with the daemon.
    pub enabled: bool,
    /// The job's pipeline implementation (start/stop/health_check).
    pub pipeline: Box<dyn DynPipeline>,
}

impl ModuleHandle {
    /// Create a new handle.
    pub fn new(name: impl Into<String>, enabled: bool, pipeline: Box<dyn DynPipeline>) -> Self {
        Self {
            name: name.into(),
            enabled,
            pipeline,
        }
    }

    /// Check the job's health status.
    ///
    /// Disabled jobs always report `Healthy`.
    pub async fn health_check(&self) -> HealthStatus {
        if !self.enabled {
            return HealthStatus::Healthy;
        }
        self.pipeline.health_check().await
    }
}

/// Registry of all job pipelines, in configuration order.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: Vec<ModuleHandle>,
}

impl ModuleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job. Names must be unique.
    pub fn register(&mut self, handle: ModuleHandle) -> anyhow::Result<()> {
        if self.modules.iter().any(|m| m.name == handle.name) {
            return Err(anyhow::anyhow!("job '{}' already registered", handle.name));
        }
        self.modules.push(handle);
        Ok(())
    }

    /// Start all enabled jobs in registration order.
    ///
    /// Returns an error on the first job that fails to start.
    /// Already-started jobs are NOT rolled back; the caller should
    /// invoke `stop_all` if partial startup is unacceptable.
    pub async fn start_all(&mut self) -> anyhow::Result<()> {
        for handle in &mut self.modules {
            if !handle.enabled {
                tracing::debug!(job = %handle.name, "skipping disabled job");
                continue;
            }

            handle
                .pipeline
                .start()
                .await
                .map_err(|e| anyhow::anyhow!("failed to start job '{}': {}", handle.name, e))?;
            tracing::info!(job = %handle.name, "job started");
        }
        Ok(())
    }

    /// Stop all enabled jobs in reverse registration order.
    ///
    /// Jobs that were never started (or already stopped) report `NotRunning`,
    /// which is not treated as a failure here. Other errors are collected
    /// and the remaining jobs are still stopped.
    pub async fn stop_all(&mut self) -> anyhow::Result<()> {
        let mut errors = Vec::new();

        for handle in self.modules.iter_mut().rev() {
            if !handle.enabled {
                continue;
            }

            match handle.pipeline.stop().await {
                Ok(()) => tracing::info!(job = %handle.name, "job stopped"),
                Err(weblog_core::WeblogError::Pipeline(
                    weblog_core::PipelineError::NotRunning,
                )) => {
                    tracing::debug!(job = %handle.name, "job was not running");
                }
                Err(e) => {
                    tracing::error!(job = %handle.name, error = %e, "failed to stop job");
                    errors.push(format!("{}: {}", handle.name, e));
                }
            }
        }

        if !errors.is_empty() {
            return Err(anyhow::anyhow!("errors stopping jobs: {}", errors.join("; ")));
        }

        Ok(())
    }

    /// Health status of every registered job: (name, enabled, status).
    pub async fn health_statuses(&self) -> Vec<(String, bool, HealthStatus)> {
        let mut statuses = Vec::with_capacity(self.modules.len());
        for handle in &self.modules {
            let status = handle.health_check().await;
            statuses.push((handle.name.clone(), handle.enabled, status));
        }
        statuses
    }

    /// Number of registered jobs.
    pub fn count(&self) -> usize {
        self.modules.len()
    }

    /// Number of enabled jobs.
    pub fn enabled_count(&self) -> usize {
        self.modules.iter().filter(|m| m.enabled).count()
    }
}
