//! Job pipeline initialization.
//!
//! Converts one `[[jobs]]` entry into a `PipelineConfig`, builds the
//! `LogPipeline` wired to the shared snapshot channel and message-count
//! watcher, and wraps it in a `ModuleHandle`.
//!
//! ```text
//! LogPipeline(job A) --JobSnapshot--\
//!                                    >-- snapshot_tx --> orchestrator publisher
//! LogPipeline(job B) --JobSnapshot--/
//! ```

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;

use weblog_core::config::{GeneralConfig, JobConfig};
use weblog_core::logger::MsgCountWatcher;
use weblog_log_pipeline::{JobSnapshot, LogPipelineBuilder, PipelineConfig};

use super::ModuleHandle;

/// Build the pipeline config for one job, applying daemon-wide settings.
pub fn pipeline_config(general: &GeneralConfig, job: &JobConfig) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::from_core(job);
    config.msg_limit = general.msg_limit;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("job '{}': {}", job.name, e))?;
    Ok(config)
}

/// Initialize the pipeline for one job.
pub fn init(
    general: &GeneralConfig,
    job: &JobConfig,
    snapshot_tx: mpsc::Sender<JobSnapshot>,
    watcher: Arc<MsgCountWatcher>,
) -> Result<ModuleHandle> {
    tracing::info!(job = %job.name, path = %job.path, "initializing job pipeline");

    let config = pipeline_config(general, job)?;
    let (pipeline, _) = LogPipelineBuilder::new()
        .config(config)
        .snapshot_sender(snapshot_tx)
        .watcher(watcher)
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build pipeline for job '{}': {}", job.name, e))?;

    Ok(ModuleHandle::new(job.name.clone(), true, Box::new(pipeline)))
}
