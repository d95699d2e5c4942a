//! Layered configuration shared by the plugin host daemon and its tools.
//!
//! [`Config`] is resolved by `ortho_config` from, in increasing precedence,
//! built-in defaults, a TOML file, `ASSIST_*` environment variables and
//! command-line flags. The resolved value is handed to constructors
//! explicitly; nothing in the workspace reads configuration from globals.

mod defaults;
mod logging;

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_KILL_CONFIRM_SECS, DEFAULT_LOG_FILTER, DEFAULT_STOP_GRACE_SECS, MANIFEST_FILE_NAME,
    default_log_filter, default_log_filter_string, default_log_format, default_plugins_dir,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved configuration for the plugin host.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "ASSIST")]
pub struct Config {
    /// Directory scanned for plugin subdirectories.
    #[serde(default)]
    pub plugins_dir: Option<Utf8PathBuf>,
    /// `tracing` filter expression applied to daemon logs.
    #[serde(default = "defaults::default_log_filter_string")]
    pub log_filter: String,
    /// Log record encoding.
    #[serde(default = "defaults::default_log_format")]
    pub log_format: LogFormat,
    /// Seconds a plugin may take to exit after a termination request.
    #[serde(default = "defaults::default_stop_grace_secs")]
    pub stop_grace_secs: u64,
    /// Seconds to wait for a forced kill to be confirmed.
    #[serde(default = "defaults::default_kill_confirm_secs")]
    pub kill_confirm_secs: u64,
    /// Start persistent plugins when the daemon boots.
    #[serde(default = "defaults::default_autostart")]
    pub autostart: bool,
    /// Serve JSONL commands on the daemon's stdin and stdout.
    #[serde(default)]
    pub control_stdin: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            plugins_dir: None,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            stop_grace_secs: DEFAULT_STOP_GRACE_SECS,
            kill_confirm_secs: DEFAULT_KILL_CONFIRM_SECS,
            autostart: true,
            control_stdin: false,
        }
    }
}

impl Config {
    /// Returns the plugin root, falling back to the platform default.
    #[must_use]
    pub fn plugins_dir(&self) -> Utf8PathBuf {
        self.plugins_dir.clone().unwrap_or_else(default_plugins_dir)
    }

    /// Returns the configured plugin root override, if any.
    #[must_use]
    pub fn plugins_dir_override(&self) -> Option<&Utf8Path> {
        self.plugins_dir.as_deref()
    }

    /// Returns the log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Returns the log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Returns the graceful termination window.
    #[must_use]
    pub const fn stop_grace_period(&self) -> Duration {
        Duration::from_secs(self.stop_grace_secs)
    }

    /// Returns the window allowed for a forced kill to be confirmed.
    #[must_use]
    pub const fn kill_confirm_period(&self) -> Duration {
        Duration::from_secs(self.kill_confirm_secs)
    }

    /// Returns whether persistent plugins start with the daemon.
    #[must_use]
    pub const fn autostart(&self) -> bool {
        self.autostart
    }

    /// Returns whether the daemon serves commands on stdin.
    #[must_use]
    pub const fn control_stdin(&self) -> bool {
        self.control_stdin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.log_filter(), "info");
        assert_eq!(config.log_format(), LogFormat::Json);
        assert_eq!(config.stop_grace_period(), Duration::from_secs(5));
        assert_eq!(config.kill_confirm_period(), Duration::from_secs(5));
        assert!(config.autostart());
        assert!(!config.control_stdin());
        assert!(config.plugins_dir_override().is_none());
    }

    #[test]
    fn plugins_dir_override_wins_over_default() {
        let config = Config {
            plugins_dir: Some(Utf8PathBuf::from("/srv/plugins")),
            ..Config::default()
        };
        assert_eq!(config.plugins_dir(), Utf8PathBuf::from("/srv/plugins"));
    }

    #[test]
    fn plugins_dir_falls_back_to_platform_default() {
        let config = Config::default();
        assert_eq!(config.plugins_dir(), default_plugins_dir());
    }
}
