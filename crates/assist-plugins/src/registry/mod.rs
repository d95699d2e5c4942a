//! Name-addressed facade over manifests and running plugin processes.
//!
//! [`PluginRegistry`] is what front ends talk to. It loads manifests on
//! demand, starts plugins lazily when they are first invoked and enforces
//! each manifest's function allow-list before any bytes reach the plugin.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{ChannelError, PluginError};
use crate::manifest::PluginInfo;
use crate::store::ManifestStore;
use crate::supervisor::{ShutdownReport, StartOutcome, StopOutcome, Supervisor};

const REGISTRY_TARGET: &str = "assist_plugins::registry";

/// Result of starting every persistent plugin.
#[derive(Debug, Default)]
pub struct AutostartReport {
    /// Plugins that are running after the sweep.
    pub started: Vec<String>,
    /// Plugins that could not be started.
    pub failures: Vec<(String, PluginError)>,
}

/// Composition of the manifest store and the process supervisor.
///
/// # Example
///
/// ```no_run
/// use assist_plugins::{ManifestStore, PluginRegistry, Supervisor, SupervisorConfig};
/// use serde_json::json;
///
/// let registry = PluginRegistry::new(
///     ManifestStore::new("/opt/assist/plugins"),
///     Supervisor::new(SupervisorConfig::default()),
/// );
/// for info in registry.list() {
///     println!("{} running={}", info.name, info.running);
/// }
/// let reply = registry
///     .invoke("weather", "forecast", json!({"city": "Oslo"}))
///     .expect("weather plugin answers");
/// println!("{reply}");
/// ```
#[derive(Debug)]
pub struct PluginRegistry {
    store: ManifestStore,
    supervisor: Supervisor,
}

impl PluginRegistry {
    /// Creates a registry from its parts.
    #[must_use]
    pub const fn new(store: ManifestStore, supervisor: Supervisor) -> Self {
        Self { store, supervisor }
    }

    /// Returns the manifest store.
    #[must_use]
    pub const fn store(&self) -> &ManifestStore {
        &self.store
    }

    /// Returns the process supervisor.
    #[must_use]
    pub const fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    /// Describes every discoverable plugin. Manifests that fail to load are
    /// logged and left out.
    #[must_use]
    pub fn list(&self) -> Vec<PluginInfo> {
        self.store
            .discover()
            .into_iter()
            .filter_map(|name| match self.store.get_or_load(&name) {
                Ok(manifest) => Some(PluginInfo::new(&manifest, self.supervisor.is_running(&name))),
                Err(error) => {
                    warn!(
                        target: REGISTRY_TARGET,
                        plugin = %name,
                        %error,
                        "skipping plugin with unusable manifest"
                    );
                    None
                }
            })
            .collect()
    }

    /// Describes one plugin.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Manifest`] if the manifest cannot be loaded.
    pub fn get_info(&self, name: &str) -> Result<PluginInfo, PluginError> {
        let manifest = self.store.get_or_load(name)?;
        Ok(PluginInfo::new(&manifest, self.supervisor.is_running(name)))
    }

    /// Starts the plugin unless it is already running.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Manifest`] or [`PluginError::Start`].
    pub fn start(&self, name: &str) -> Result<StartOutcome, PluginError> {
        let manifest = self.store.get_or_load(name)?;
        let dir = self.store.plugin_dir(name)?;
        Ok(self.supervisor.start(name, &manifest, &dir)?)
    }

    /// Stops the plugin if it is running.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Stop`] when termination cannot be confirmed.
    pub fn stop(&self, name: &str) -> Result<StopOutcome, PluginError> {
        Ok(self.supervisor.stop(name)?)
    }

    /// Invokes `function` on the plugin and returns its reply verbatim.
    ///
    /// The plugin is started first if it is not running. Functions missing
    /// from the manifest are refused without contacting the plugin.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Manifest`] for an unusable manifest and
    /// [`PluginError::Channel`] for start failures, unknown functions and
    /// failed exchanges.
    pub fn invoke(&self, name: &str, function: &str, params: Value) -> Result<Value, PluginError> {
        self.prepare(name, function)?;
        Ok(self.supervisor.send(name, function, params)?)
    }

    /// Invokes `function` and collects every frame of a streamed reply.
    ///
    /// # Errors
    ///
    /// As [`PluginRegistry::invoke`].
    pub fn invoke_streaming(
        &self,
        name: &str,
        function: &str,
        params: Value,
    ) -> Result<Vec<Value>, PluginError> {
        self.prepare(name, function)?;
        Ok(self.supervisor.send_streaming(name, function, params)?)
    }

    /// Starts every discovered plugin whose manifest is marked persistent.
    ///
    /// Failures are logged and collected; the sweep always completes.
    #[must_use]
    pub fn start_persistent(&self) -> AutostartReport {
        let mut report = AutostartReport::default();
        for name in self.store.discover() {
            let persistent = match self.store.get_or_load(&name) {
                Ok(manifest) => manifest.is_persistent(),
                Err(error) => {
                    warn!(target: REGISTRY_TARGET, plugin = %name, %error, "cannot read manifest");
                    report.failures.push((name, error.into()));
                    continue;
                }
            };
            if !persistent {
                continue;
            }
            match self.start(&name) {
                Ok(outcome) => {
                    debug!(target: REGISTRY_TARGET, plugin = %name, pid = outcome.pid(), "autostarted");
                    report.started.push(name);
                }
                Err(error) => {
                    warn!(target: REGISTRY_TARGET, plugin = %name, %error, "autostart failed");
                    report.failures.push((name, error));
                }
            }
        }
        info!(
            target: REGISTRY_TARGET,
            started = report.started.len(),
            failed = report.failures.len(),
            "persistent plugins started"
        );
        report
    }

    /// Stops every running plugin.
    #[must_use]
    pub fn shutdown_all(&self) -> ShutdownReport {
        self.supervisor.shutdown_all()
    }

    /// Returns the names of running plugins, sorted.
    #[must_use]
    pub fn running(&self) -> Vec<String> {
        self.supervisor.running()
    }

    fn prepare(&self, name: &str, function: &str) -> Result<(), PluginError> {
        let manifest = self.store.get_or_load(name)?;
        if !self.supervisor.is_running(name) {
            let dir = self.store.plugin_dir(name)?;
            self.supervisor
                .start(name, &manifest, &dir)
                .map_err(|source| ChannelError::NotRunning {
                    name: name.to_owned(),
                    source: Some(Box::new(source)),
                })?;
            debug!(target: REGISTRY_TARGET, plugin = name, "started plugin on first use");
        }
        if !manifest.has_function(function) {
            return Err(ChannelError::UnknownFunction {
                name: name.to_owned(),
                function: function.to_owned(),
            }
            .into());
        }
        Ok(())
    }
}
