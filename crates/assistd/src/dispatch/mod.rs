//! Closed command set accepted by the daemon and its dispatcher.
//!
//! Each command arrives as one JSON object tagged by `command`, for example
//! `{"command":"invoke_plugin","plugin_name":"echo","function_name":"echo"}`.
//! Every command yields a [`CommandOutcome`]; unknown or malformed input is
//! answered with a failure outcome instead of ending the session.

use std::error::Error;

use assist_plugins::{PluginRegistry, StartOutcome, StopOutcome};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::gpu::GpuInfoProvider;

const DISPATCH_TARGET: &str = "assistd::dispatch";

/// Commands understood by the daemon.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum RegistryCommand {
    /// Describe every discovered plugin.
    ListPlugins,
    /// Start a plugin's process.
    StartPlugin {
        /// Plugin directory name.
        plugin_name: String,
    },
    /// Stop a plugin's process.
    StopPlugin {
        /// Plugin directory name.
        plugin_name: String,
    },
    /// Call one of a plugin's functions, starting the plugin if needed.
    InvokePlugin {
        /// Plugin directory name.
        plugin_name: String,
        /// Function declared in the plugin's manifest.
        function_name: String,
        /// Properties forwarded to the plugin.
        #[serde(default = "empty_params")]
        params: Value,
    },
    /// Describe one plugin.
    GetPluginInfo {
        /// Plugin directory name.
        plugin_name: String,
    },
    /// Report the GPU description.
    GetGpuInfo,
    /// Stop all plugins and end the session.
    Shutdown,
}

fn empty_params() -> Value {
    Value::Object(Map::new())
}

/// Reply to a single command.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CommandOutcome {
    /// Whether the command did what was asked.
    pub success: bool,
    /// Command-specific payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Human-readable failure description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandOutcome {
    /// Builds a successful outcome carrying `result`.
    #[must_use]
    pub const fn success(result: Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
        }
    }

    /// Builds a failed outcome with `message`.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(message.into()),
        }
    }

    fn from_error(error: &(dyn Error + 'static)) -> Self {
        Self::failure(error_chain(error))
    }
}

/// Whether the session should keep reading commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next command.
    Continue,
    /// A shutdown was requested.
    Stop,
}

/// Renders an error and the causes its message does not already include.
#[must_use]
pub fn error_chain(error: &(dyn Error + 'static)) -> String {
    let mut text = error.to_string();
    let mut cause = error.source();
    while let Some(current) = cause {
        let message = current.to_string();
        if !text.contains(&message) {
            text.push_str(": ");
            text.push_str(&message);
        }
        cause = current.source();
    }
    text
}

/// Executes [`RegistryCommand`]s against a plugin registry.
pub struct CommandHandler<'a> {
    registry: &'a PluginRegistry,
    gpu: &'a dyn GpuInfoProvider,
}

impl<'a> CommandHandler<'a> {
    /// Binds a handler to `registry` and `gpu`.
    #[must_use]
    pub const fn new(registry: &'a PluginRegistry, gpu: &'a dyn GpuInfoProvider) -> Self {
        Self { registry, gpu }
    }

    /// Parses and executes one JSON command line.
    #[must_use]
    pub fn handle_line(&self, line: &str) -> (CommandOutcome, Flow) {
        match serde_json::from_str::<RegistryCommand>(line) {
            Ok(command) => self.handle(command),
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "rejected command line");
                (
                    CommandOutcome::failure(describe_rejection(line, &error)),
                    Flow::Continue,
                )
            }
        }
    }

    /// Executes `command`.
    #[must_use]
    pub fn handle(&self, command: RegistryCommand) -> (CommandOutcome, Flow) {
        debug!(target: DISPATCH_TARGET, ?command, "dispatching command");
        match command {
            RegistryCommand::ListPlugins => (self.list_plugins(), Flow::Continue),
            RegistryCommand::StartPlugin { plugin_name } => {
                (self.start_plugin(&plugin_name), Flow::Continue)
            }
            RegistryCommand::StopPlugin { plugin_name } => {
                (self.stop_plugin(&plugin_name), Flow::Continue)
            }
            RegistryCommand::InvokePlugin {
                plugin_name,
                function_name,
                params,
            } => (
                self.invoke_plugin(&plugin_name, &function_name, params),
                Flow::Continue,
            ),
            RegistryCommand::GetPluginInfo { plugin_name } => {
                (self.plugin_info(&plugin_name), Flow::Continue)
            }
            RegistryCommand::GetGpuInfo => (
                CommandOutcome::success(json!(self.gpu.gpu_info())),
                Flow::Continue,
            ),
            RegistryCommand::Shutdown => (
                CommandOutcome::success(json!({"message": "shutting down"})),
                Flow::Stop,
            ),
        }
    }

    fn list_plugins(&self) -> CommandOutcome {
        CommandOutcome::success(json!({ "plugins": self.registry.list() }))
    }

    fn start_plugin(&self, name: &str) -> CommandOutcome {
        match self.registry.start(name) {
            Ok(outcome) => CommandOutcome::success(json!({
                "plugin_name": name,
                "pid": outcome.pid(),
                "already_running": matches!(outcome, StartOutcome::AlreadyRunning { .. }),
            })),
            Err(error) => CommandOutcome::from_error(&error),
        }
    }

    fn stop_plugin(&self, name: &str) -> CommandOutcome {
        match self.registry.stop(name) {
            Ok(StopOutcome::Stopped { exit_code }) => CommandOutcome::success(json!({
                "plugin_name": name,
                "was_running": true,
                "exit_code": exit_code,
            })),
            Ok(StopOutcome::NotRunning) => CommandOutcome::success(json!({
                "plugin_name": name,
                "was_running": false,
            })),
            Err(error) => CommandOutcome::from_error(&error),
        }
    }

    fn invoke_plugin(&self, name: &str, function: &str, params: Value) -> CommandOutcome {
        self.registry
            .invoke(name, function, params)
            .map_or_else(|error| CommandOutcome::from_error(&error), CommandOutcome::success)
    }

    fn plugin_info(&self, name: &str) -> CommandOutcome {
        self.registry.get_info(name).map_or_else(
            |error| CommandOutcome::from_error(&error),
            |info| CommandOutcome::success(json!(info)),
        )
    }
}

fn describe_rejection(line: &str, error: &serde_json::Error) -> String {
    let command = serde_json::from_str::<Value>(line)
        .ok()
        .and_then(|value| value.get("command").and_then(Value::as_str).map(String::from));
    match command {
        Some(name) if error.to_string().starts_with("unknown variant") => {
            format!("unknown command: {name}")
        }
        _ => format!("invalid command: {error}"),
    }
}

#[cfg(test)]
mod tests;
