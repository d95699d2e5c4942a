//! Plugin discovery, supervision and messaging for the assist host.
//!
//! Plugins are standalone executables packaged one per directory under a
//! plugin root, each described by a `manifest.json`. This crate finds them,
//! runs them as long-lived child processes and exchanges JSON messages with
//! them over their standard streams.
//!
//! # Architecture
//!
//! - [`ManifestStore`] discovers plugin directories and caches parsed
//!   [`PluginManifest`]s.
//! - [`Supervisor`] spawns plugin processes, watches them exit and stops
//!   them with a graceful request followed by a kill.
//! - [`PluginChannel`] frames requests and replies on a plugin's pipes; see
//!   [`protocol`] for the wire format.
//! - [`PluginRegistry`] ties the three together behind name-addressed
//!   operations, starting plugins lazily and enforcing each manifest's
//!   function allow-list.
//!
//! # Example
//!
//! ```no_run
//! use assist_plugins::{ManifestStore, PluginRegistry, Supervisor, SupervisorConfig};
//! use serde_json::json;
//!
//! let registry = PluginRegistry::new(
//!     ManifestStore::new("/opt/assist/plugins"),
//!     Supervisor::new(SupervisorConfig::default()),
//! );
//! let report = registry.start_persistent();
//! assert!(report.failures.is_empty());
//!
//! let reply = registry
//!     .invoke("echo", "echo", json!({"text": "hello"}))
//!     .expect("echo plugin replies");
//! assert_eq!(reply["success"], json!(true));
//!
//! let shutdown = registry.shutdown_all();
//! assert!(shutdown.is_clean());
//! ```

pub mod channel;
pub mod error;
pub mod manifest;
pub mod protocol;
pub mod registry;
pub mod store;
pub mod supervisor;

#[cfg(test)]
mod tests;

pub use self::channel::PluginChannel;
pub use self::error::{ChannelError, ManifestError, PluginError, StartError, StopError};
pub use self::manifest::{FunctionSpec, PluginInfo, PluginManifest};
pub use self::protocol::{CommandEnvelope, END_MARKER, Frame, FrameReader, ToolCall};
pub use self::registry::{AutostartReport, PluginRegistry};
pub use self::store::{MANIFEST_FILE, ManifestStore};
pub use self::supervisor::{
    ProcessState, ShutdownReport, StartOutcome, StopOutcome, Supervisor, SupervisorConfig,
};
