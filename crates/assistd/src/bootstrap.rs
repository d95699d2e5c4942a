//! Daemon bootstrap orchestration.

use std::sync::Arc;

use assist_config::Config;
use assist_plugins::{
    AutostartReport, ManifestStore, PluginRegistry, ShutdownReport, Supervisor, SupervisorConfig,
};
use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

use crate::dispatch::CommandHandler;
use crate::gpu::GpuInfoProvider;
use crate::health::HealthReporter;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Source of the daemon configuration.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    ///
    /// # Errors
    ///
    /// Returns the loader's error when a layer is malformed.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that reads flags, `ASSIST_*` variables and the config file.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load_from_iter(std::env::args_os())
    }
}

/// Loader that hands out a fixed configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
}

/// A bootstrapped daemon: configuration, plugin registry and collaborators.
pub struct Daemon {
    config: Config,
    registry: PluginRegistry,
    gpu: Box<dyn GpuInfoProvider>,
    reporter: Arc<dyn HealthReporter>,
    telemetry: TelemetryHandle,
}

impl Daemon {
    /// Returns the resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the plugin registry.
    #[must_use]
    pub const fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Returns the telemetry handle.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Builds a command handler bound to this daemon.
    #[must_use]
    pub fn handler(&self) -> CommandHandler<'_> {
        CommandHandler::new(&self.registry, self.gpu.as_ref())
    }

    /// Starts persistent plugins when autostart is enabled.
    ///
    /// Returns `None` when autostart is switched off.
    #[must_use]
    pub fn autostart(&self) -> Option<AutostartReport> {
        if !self.config.autostart() {
            return None;
        }
        let report = self.registry.start_persistent();
        self.reporter.autostart_finished(&report);
        Some(report)
    }

    /// Stops every running plugin.
    #[must_use]
    pub fn shutdown(&self) -> ShutdownReport {
        let report = self.registry.shutdown_all();
        self.reporter.shutdown_finished(&report);
        report
    }
}

/// Bootstraps the daemon using the supplied collaborators.
///
/// Loads configuration, installs telemetry and builds the plugin registry.
/// No plugin is started; see [`Daemon::autostart`].
///
/// # Errors
///
/// Returns [`BootstrapError`] when configuration or telemetry fails. The
/// reporter is told about the failure before it is returned.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    gpu: Box<dyn GpuInfoProvider>,
) -> Result<Daemon, BootstrapError> {
    reporter.bootstrap_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => {
            let error = BootstrapError::Configuration { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let telemetry = match telemetry::initialise(&config) {
        Ok(handle) => handle,
        Err(source) => {
            let error = BootstrapError::Telemetry { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let supervisor = Supervisor::new(SupervisorConfig::new(
        config.stop_grace_period(),
        config.kill_confirm_period(),
    ));
    let registry = PluginRegistry::new(
        ManifestStore::new(config.plugins_dir().into_std_path_buf()),
        supervisor,
    );
    reporter.bootstrap_succeeded(&config);

    Ok(Daemon {
        config,
        registry,
        gpu,
        reporter,
        telemetry,
    })
}
