//! Domain errors raised by plugin operations.
//!
//! Each stage of a plugin's life has its own `thiserror` enum so callers can
//! tell a broken manifest from a failed spawn or a misbehaving reply.
//! [`PluginError`] unifies them for the registry. I/O and JSON errors are
//! wrapped in `Arc` to keep the enums cheap to move and clone-friendly.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Failures while locating or parsing a plugin manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The plugin name is not a single plain directory name.
    #[error("invalid plugin name '{name}': must be a single directory name")]
    InvalidName {
        /// Name that was rejected.
        name: String,
    },

    /// No manifest file exists for the plugin.
    #[error("manifest for plugin '{name}' not found at {}", path.display())]
    NotFound {
        /// Plugin name.
        name: String,
        /// Path that was checked.
        path: PathBuf,
    },

    /// The manifest file exists but could not be read.
    #[error("failed to read manifest for plugin '{name}' at {}: {source}", path.display())]
    Read {
        /// Plugin name.
        name: String,
        /// Manifest path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The manifest file is not valid JSON or has the wrong shape.
    #[error("malformed manifest for plugin '{name}' at {}: {source}", path.display())]
    Malformed {
        /// Plugin name.
        name: String,
        /// Manifest path.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: Arc<serde_json::Error>,
    },

    /// Two functions in one manifest share a name.
    #[error("plugin '{name}' declares function '{function}' more than once")]
    DuplicateFunction {
        /// Plugin name.
        name: String,
        /// Repeated function name.
        function: String,
    },
}

/// Failures while launching a plugin process.
#[derive(Debug, Error)]
pub enum StartError {
    /// The manifest has no executable, or the executable file is absent.
    #[error("plugin '{name}' executable missing{}", describe_path(path.as_ref()))]
    ExecutableMissing {
        /// Plugin name.
        name: String,
        /// Resolved path, when the manifest named one.
        path: Option<PathBuf>,
    },

    /// The manifest points outside the plugin's own directory.
    #[error("plugin '{name}' executable '{}' escapes the plugin directory", executable.display())]
    ExecutableOutsidePluginDir {
        /// Plugin name.
        name: String,
        /// Executable path as written in the manifest.
        executable: PathBuf,
    },

    /// The operating system refused to create the process.
    #[error("plugin '{name}' failed to spawn: {source}")]
    Spawn {
        /// Plugin name.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// A standard stream was not captured after spawning.
    #[error("plugin '{name}' started without a piped {stream}")]
    PipeUnavailable {
        /// Plugin name.
        name: String,
        /// Stream that was missing.
        stream: &'static str,
    },

    /// A monitoring thread could not be created.
    #[error("failed to launch {role} worker for plugin '{name}': {source}")]
    Worker {
        /// Plugin name.
        name: String,
        /// Worker role (`stdout`, `stderr` or `exit`).
        role: &'static str,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },
}

fn describe_path(path: Option<&PathBuf>) -> String {
    path.map(|resolved| format!(": {}", resolved.display()))
        .unwrap_or_else(|| String::from(": manifest has no 'executable' entry"))
}

/// Failures while terminating a plugin process.
#[derive(Debug, Error)]
pub enum StopError {
    /// A termination signal could not be delivered.
    #[error("failed to send {signal} to plugin '{name}': {source}")]
    Signal {
        /// Plugin name.
        name: String,
        /// Signal that failed.
        signal: &'static str,
        /// Underlying OS error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The process did not exit even after a forced kill.
    #[error("plugin '{name}' did not confirm exit {waited_ms}ms after a forced kill")]
    KillUnconfirmed {
        /// Plugin name.
        name: String,
        /// Time waited for confirmation, in milliseconds.
        waited_ms: u128,
    },

    /// Forced termination is not available on this platform.
    #[error("plugin '{name}' ignored graceful shutdown and cannot be killed on this platform")]
    Unsupported {
        /// Plugin name.
        name: String,
    },
}

/// Failures on the request/reply channel to a plugin.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The plugin is not running and could not be started.
    #[error("plugin '{name}' is not running")]
    NotRunning {
        /// Plugin name.
        name: String,
        /// Start failure that prevented a lazy start, if one was attempted.
        #[source]
        source: Option<Box<StartError>>,
    },

    /// The function is not in the plugin's manifest.
    #[error("plugin '{name}' has no function '{function}'")]
    UnknownFunction {
        /// Plugin name.
        name: String,
        /// Requested function.
        function: String,
    },

    /// The plugin replied with something other than JSON.
    #[error("plugin '{name}' replied with invalid JSON: {source}")]
    MalformedReply {
        /// Plugin name.
        name: String,
        /// Raw reply text.
        reply: String,
        /// Underlying JSON error.
        #[source]
        source: Arc<serde_json::Error>,
    },

    /// The plugin answered with an empty frame or closed its output
    /// before replying.
    #[error("plugin '{name}' sent no reply")]
    NoReply {
        /// Plugin name.
        name: String,
    },

    /// Writing the request to the plugin failed.
    #[error("I/O error writing to plugin '{name}': {source}")]
    Io {
        /// Plugin name.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The request could not be encoded as JSON.
    #[error("failed to serialise request for plugin '{name}': {source}")]
    Serialize {
        /// Plugin name.
        name: String,
        /// Underlying JSON error.
        #[source]
        source: Arc<serde_json::Error>,
    },
}

/// Any failure surfaced by the plugin registry.
#[derive(Debug, Error)]
pub enum PluginError {
    /// Manifest lookup or parsing failed.
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    /// Launching the plugin failed.
    #[error(transparent)]
    Start(#[from] StartError),
    /// Terminating the plugin failed.
    #[error(transparent)]
    Stop(#[from] StopError),
    /// The request/reply exchange failed.
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

#[cfg(test)]
mod tests;
