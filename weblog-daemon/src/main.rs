use anyhow::Result;
use clap::Parser;

use weblog_core::config::WeblogConfig;
use weblog_daemon::cli::DaemonCli;
use weblog_daemon::logging;
use weblog_daemon::modules::log_pipeline;
use weblog_daemon::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    let mut config = WeblogConfig::load(&cli.config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load config {}: {}", cli.config.display(), e))?;
    cli.apply_overrides(&mut config)?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

    logging::init_tracing(&config.general)?;

    if cli.validate {
        for job in &config.jobs {
            log_pipeline::pipeline_config(&config.general, job)?;
        }
        tracing::info!(
            config = %cli.config.display(),
            jobs = config.jobs.len(),
            "configuration is valid"
        );
        return Ok(());
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        jobs = config.jobs.len(),
        "weblog-daemon starting"
    );

    let mut orchestrator = Orchestrator::build_from_config(config).await?;
    orchestrator.run().await
}
