//! CLI argument definitions for weblog-daemon.

use std::path::PathBuf;

use clap::Parser;

use weblog_core::config::WeblogConfig;

/// Web access log metrics daemon.
///
/// Runs one access log pipeline per configured job and publishes each
/// interval's snapshot as Prometheus gauges.
#[derive(Parser, Debug)]
#[command(name = "weblog-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to weblog.toml configuration file.
    #[arg(short, long, default_value = "/etc/weblog/weblog.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Run only the named jobs (repeatable). All jobs run when omitted.
    #[arg(long = "job")]
    pub jobs: Vec<String>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,
}

impl DaemonCli {
    /// Apply CLI overrides on top of the file and environment configuration.
    pub fn apply_overrides(&self, config: &mut WeblogConfig) -> anyhow::Result<()> {
        if let Some(level) = &self.log_level {
            config.general.log_level.clone_from(level);
        }
        if let Some(format) = &self.log_format {
            config.general.log_format.clone_from(format);
        }

        if !self.jobs.is_empty() {
            if let Some(unknown) = self
                .jobs
                .iter()
                .find(|name| !config.jobs.iter().any(|job| &job.name == *name))
            {
                return Err(anyhow::anyhow!("unknown job '{}' in --job", unknown));
            }
            config.jobs.retain(|job| self.jobs.contains(&job.name));
        }

        Ok(())
    }
}
