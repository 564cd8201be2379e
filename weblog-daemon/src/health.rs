//! Aggregated health reporting.
//!
//! The daemon status is the worst status among all running jobs.
//!
//! - All Healthy -> Healthy
//! - Any Degraded, none Unhealthy -> Degraded(reason)
//! - Any Unhealthy -> Unhealthy(reason)
//!
//! A job whose log source was fully read reports `Unhealthy("source exhausted")`.

use serde::Serialize;

use weblog_core::pipeline::HealthStatus;

/// Aggregated health report for the entire daemon.
#[derive(Debug, Clone, Serialize)]
pub struct DaemonHealth {
    /// Overall daemon health status (worst of all jobs).
    pub status: HealthStatus,
    /// Daemon uptime in seconds since start.
    pub uptime_secs: u64,
    /// Per-job health reports.
    pub jobs: Vec<JobHealth>,
}

/// Health status for a single job.
#[derive(Debug, Clone, Serialize)]
pub struct JobHealth {
    /// Job name from `[[jobs]]`.
    pub name: String,
    /// Whether the job takes part in aggregation.
    pub enabled: bool,
    /// Current health status of the job pipeline.
    pub status: HealthStatus,
}

/// Reduce job statuses to one status, joining the reasons of the worst level.
pub fn aggregate_status(jobs: &[JobHealth]) -> HealthStatus {
    let mut degraded = Vec::new();
    let mut unhealthy = Vec::new();

    for job in jobs.iter().filter(|j| j.enabled) {
        match &job.status {
            HealthStatus::Healthy => {}
            HealthStatus::Degraded(reason) => degraded.push(format!("{}: {}", job.name, reason)),
            HealthStatus::Unhealthy(reason) => {
                unhealthy.push(format!("{}: {}", job.name, reason));
            }
        }
    }

    if !unhealthy.is_empty() {
        HealthStatus::Unhealthy(unhealthy.join("; "))
    } else if !degraded.is_empty() {
        HealthStatus::Degraded(degraded.join("; "))
    } else {
        HealthStatus::Healthy
    }
}
