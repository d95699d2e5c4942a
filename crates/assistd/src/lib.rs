//! The assist plugin host daemon.
//!
//! `assistd` loads its configuration, installs structured telemetry and
//! builds a [`PluginRegistry`](assist_plugins::PluginRegistry) over the
//! configured plugin root. Plugins marked persistent start with the daemon;
//! the rest start the first time they are invoked.
//!
//! Clients drive the daemon with [`RegistryCommand`]s, one JSON object per
//! line, when the control stream is enabled. The run ends on a termination
//! signal, a `shutdown` command or the end of the control stream, and every
//! plugin is stopped before the process exits.

mod bootstrap;
mod dispatch;
mod gpu;
mod health;
mod process;
mod telemetry;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use dispatch::{CommandHandler, CommandOutcome, Flow, RegistryCommand, error_chain};
pub use gpu::{GpuInfoProvider, StaticGpuInfo};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{
    ControlStreams, DaemonExit, LaunchError, ShutdownCause, ShutdownError, ShutdownSignal,
    SystemShutdownSignal, run_daemon, serve, serve_commands,
};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
