//! Lifecycle events surfaced to operators.

use assist_config::Config;
use assist_plugins::{AutostartReport, ShutdownReport};

use crate::bootstrap::BootstrapError;

const HEALTH_TARGET: &str = "assistd::health";

/// Observer notified at each daemon lifecycle milestone.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked after the persistent plugin sweep.
    fn autostart_finished(&self, report: &AutostartReport);

    /// Invoked after every plugin has been asked to stop.
    fn shutdown_finished(&self, report: &ShutdownReport);
}

/// Reporter that writes lifecycle events as `tracing` records.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting daemon bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            plugins_dir = %config.plugins_dir(),
            log_filter = %config.log_filter(),
            log_format = %config.log_format(),
            autostart = config.autostart(),
            "daemon bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "daemon bootstrap failed"
        );
    }

    fn autostart_finished(&self, report: &AutostartReport) {
        for (plugin, error) in &report.failures {
            tracing::warn!(
                target: HEALTH_TARGET,
                event = "autostart_failed",
                plugin = %plugin,
                error = %error,
                "persistent plugin failed to start"
            );
        }
        tracing::info!(
            target: HEALTH_TARGET,
            event = "autostart_finished",
            started = ?report.started,
            failed = report.failures.len(),
            "persistent plugins started"
        );
    }

    fn shutdown_finished(&self, report: &ShutdownReport) {
        if report.is_clean() {
            tracing::info!(
                target: HEALTH_TARGET,
                event = "shutdown_finished",
                stopped = ?report.stopped,
                "all plugins stopped"
            );
            return;
        }
        for (plugin, error) in &report.failures {
            tracing::error!(
                target: HEALTH_TARGET,
                event = "shutdown_failed",
                plugin = %plugin,
                error = %error,
                "plugin did not stop cleanly"
            );
        }
    }
}
