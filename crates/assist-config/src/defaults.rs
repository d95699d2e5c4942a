//! Default values used when no configuration layer supplies a setting.

use std::env;

use camino::Utf8PathBuf;

use crate::logging::LogFormat;

/// Default log filter expression used by the daemon.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Seconds a plugin is given to exit after a graceful termination request.
pub const DEFAULT_STOP_GRACE_SECS: u64 = 5;

/// Seconds to wait for the OS to confirm a forced kill.
pub const DEFAULT_KILL_CONFIRM_SECS: u64 = 5;

/// File name of the per-plugin descriptor.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Default log filter expression used by the daemon.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the daemon.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

pub(crate) const fn default_stop_grace_secs() -> u64 {
    DEFAULT_STOP_GRACE_SECS
}

pub(crate) const fn default_kill_confirm_secs() -> u64 {
    DEFAULT_KILL_CONFIRM_SECS
}

pub(crate) const fn default_autostart() -> bool {
    true
}

/// Computes the platform default plugin root.
///
/// Windows hosts use the machine-wide application data directory; every
/// other platform uses a directory beneath the user's home.
#[must_use]
pub fn default_plugins_dir() -> Utf8PathBuf {
    default_plugins_dir_inner()
}

#[cfg(windows)]
fn default_plugins_dir_inner() -> Utf8PathBuf {
    let base = env::var("PROGRAMDATA").unwrap_or_else(|_| String::from("C:\\ProgramData"));
    let mut dir = Utf8PathBuf::from(base);
    for part in ["NVIDIA Corporation", "nvtopps", "rise", "plugins"] {
        dir.push(part);
    }
    dir
}

#[cfg(not(windows))]
fn default_plugins_dir_inner() -> Utf8PathBuf {
    let mut dir = home_directory();
    for part in [".nvidia", "g-assist", "plugins"] {
        dir.push(part);
    }
    dir
}

#[cfg(unix)]
fn home_directory() -> Utf8PathBuf {
    dirs::home_dir()
        .and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
        .or_else(|| env::var("HOME").ok().map(Utf8PathBuf::from))
        .unwrap_or_default()
}

#[cfg(all(not(unix), not(windows)))]
fn home_directory() -> Utf8PathBuf {
    env::var("HOME").map(Utf8PathBuf::from).unwrap_or_default()
}
