//! Shared fixtures for the daemon test suites.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use assist_config::Config;
use assist_plugins::{AutostartReport, ShutdownReport};
use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig, OrthoError};
use serde_json::{Value, json};
use tempfile::TempDir;

use crate::bootstrap::{BootstrapError, ConfigLoader};
use crate::health::HealthReporter;

/// Answers each request with its properties under `echo`.
pub(crate) const ECHO: &str = r##"while IFS= read -r line; do
  props=$(printf '%s\n' "$line" | sed -n 's/^{"tool_calls":\[{"func":"[^"]*","properties":\(.*\)}\]}$/\1/p')
  printf '{"success":true,"echo":%s}\n' "$props"
done"##;

/// Exits with status 3 as soon as it starts.
pub(crate) const EXITS: &str = "exit 3";

/// Temporary plugin root populated with `/bin/sh` plugins.
pub(crate) struct PluginRoot {
    dir: TempDir,
}

impl PluginRoot {
    pub(crate) fn new() -> Self {
        Self {
            dir: TempDir::new().expect("temporary plugin root"),
        }
    }

    pub(crate) fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes a script plugin exposing `echo`; `extra` keys merge into the manifest.
    pub(crate) fn add_script(&self, name: &str, body: &str, extra: Value) {
        let dir = self.path().join(name);
        fs::create_dir_all(&dir).expect("create plugin dir");
        let mut manifest = json!({
            "executable": "run.sh",
            "description": format!("{name} test plugin"),
            "functions": [{"name": "echo"}],
        });
        if let (Some(target), Value::Object(overrides)) = (manifest.as_object_mut(), extra) {
            target.extend(overrides);
        }
        fs::write(
            dir.join("manifest.json"),
            serde_json::to_string(&manifest).expect("encode manifest"),
        )
        .expect("write manifest");
        write_executable(&dir.join("run.sh"), &format!("#!/bin/sh\n{body}\n"));
    }

    /// Configuration pointing at this root with short stop windows.
    pub(crate) fn config(&self) -> Config {
        Config {
            plugins_dir: Some(
                Utf8PathBuf::from_path_buf(self.path().to_path_buf()).expect("UTF-8 temp path"),
            ),
            stop_grace_secs: 1,
            kill_confirm_secs: 2,
            ..Config::default()
        }
    }
}

#[cfg(unix)]
fn write_executable(path: &Path, contents: &str) {
    use std::os::unix::fs::PermissionsExt;

    fs::write(path, contents).expect("write script");
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).expect("chmod script");
}

#[cfg(not(unix))]
fn write_executable(path: &Path, contents: &str) {
    fs::write(path, contents).expect("write script");
}

/// Loader that always rejects its command line.
pub(crate) struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load_from_iter(["assistd", "--stop-grace-secs", "soon"])
    }
}

/// Lifecycle events seen by [`RecordingHealthReporter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    AutostartFinished { started: Vec<String>, failed: usize },
    ShutdownFinished { clean: bool },
}

/// Reporter that keeps every event for later assertions.
#[derive(Default)]
pub(crate) struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    pub(crate) fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn autostart_finished(&self, report: &AutostartReport) {
        self.record(HealthEvent::AutostartFinished {
            started: report.started.clone(),
            failed: report.failures.len(),
        });
    }

    fn shutdown_finished(&self, report: &ShutdownReport) {
        self.record(HealthEvent::ShutdownFinished {
            clean: report.is_clean(),
        });
    }
}
