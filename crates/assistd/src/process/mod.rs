//! Daemon run loop: wait for a shutdown trigger, then stop every plugin.

mod control;
mod shutdown;

use std::io;
use std::sync::Arc;
use std::sync::mpsc::{self, Sender};
use std::thread;

use assist_plugins::ShutdownReport;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::bootstrap::{BootstrapError, Daemon, SystemConfigLoader, bootstrap_with};
use crate::gpu::StaticGpuInfo;
use crate::health::StructuredHealthReporter;

pub use self::control::{ControlStreams, serve_commands};
#[cfg(test)]
pub use self::shutdown::MockShutdownSignal;
pub use self::shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};

const PROCESS_TARGET: &str = "assistd::process";

/// What ended the daemon's run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownCause {
    /// A termination signal arrived.
    Signal,
    /// A `shutdown` command was received on the control stream.
    Command,
    /// The control stream reached end of input.
    InputClosed,
    /// The signal listener failed.
    ListenerFailed,
}

/// Summary of a completed run.
#[derive(Debug)]
pub struct DaemonExit {
    /// Trigger that started the shutdown.
    pub cause: ShutdownCause,
    /// Result of stopping the plugins.
    pub report: ShutdownReport,
}

/// Errors that prevent the daemon from running.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Bootstrap failed.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    /// Signal handlers could not be installed.
    #[error("failed to listen for shutdown signals: {source}")]
    Signal {
        /// Underlying listener error.
        #[source]
        source: ShutdownError,
    },
    /// A helper thread could not be spawned.
    #[error("failed to spawn {role} thread: {source}")]
    Worker {
        /// Thread purpose.
        role: &'static str,
        /// Underlying spawn error.
        #[source]
        source: Arc<io::Error>,
    },
}

/// Boots the daemon from the process environment and runs it to completion.
///
/// # Errors
///
/// Returns [`LaunchError`] when bootstrap, signal registration or thread
/// creation fails. Plugin stop failures are reported in the returned
/// [`DaemonExit`] instead.
pub fn run_daemon() -> Result<DaemonExit, LaunchError> {
    let daemon = bootstrap_with(
        &SystemConfigLoader,
        Arc::new(StructuredHealthReporter::new()),
        Box::new(StaticGpuInfo::default()),
    )?;
    let signal = SystemShutdownSignal::install().map_err(|source| LaunchError::Signal { source })?;
    let control = daemon.config().control_stdin().then(ControlStreams::stdio);
    serve(daemon, signal, control)
}

/// Runs a bootstrapped daemon until a shutdown trigger fires.
///
/// Persistent plugins are started first. The run ends on the first of: a
/// signal from `signal`, a `shutdown` command on `control`, or the end of
/// `control`'s input. Every plugin is stopped before returning.
///
/// # Errors
///
/// Returns [`LaunchError::Worker`] when a listener thread cannot be spawned;
/// plugins started so far are stopped when the daemon is dropped.
pub fn serve<S>(
    daemon: Daemon,
    mut signal: S,
    control: Option<ControlStreams>,
) -> Result<DaemonExit, LaunchError>
where
    S: ShutdownSignal + 'static,
{
    let shared = Arc::new(daemon);
    let autostarted = shared.autostart().map_or(0, |report| report.started.len());
    info!(target: PROCESS_TARGET, autostarted, "daemon ready");

    let (notify, notified) = mpsc::channel();
    let signal_notify = notify.clone();
    spawn_listener("signal", move || {
        let cause = match signal.wait() {
            Ok(()) => ShutdownCause::Signal,
            Err(error) => {
                error!(target: PROCESS_TARGET, %error, "shutdown listener failed");
                ShutdownCause::ListenerFailed
            }
        };
        signal_notify.send(cause).ok();
    })?;

    if let Some(streams) = control {
        let session = Arc::clone(&shared);
        spawn_control(session, streams, notify)?;
    } else {
        drop(notify);
    }

    let cause = notified.recv().unwrap_or(ShutdownCause::ListenerFailed);
    info!(target: PROCESS_TARGET, ?cause, "shutting down plugins");
    let report = shared.shutdown();
    Ok(DaemonExit { cause, report })
}

fn spawn_control(
    daemon: Arc<Daemon>,
    streams: ControlStreams,
    notify: Sender<ShutdownCause>,
) -> Result<(), LaunchError> {
    spawn_listener("control", move || {
        let cause = match streams.serve(&daemon.handler()) {
            Ok(cause) => cause,
            Err(error) => {
                warn!(target: PROCESS_TARGET, %error, "control stream failed");
                ShutdownCause::InputClosed
            }
        };
        notify.send(cause).ok();
    })
}

fn spawn_listener<F>(role: &'static str, body: F) -> Result<(), LaunchError>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(format!("assistd-{role}"))
        .spawn(body)
        .map(drop)
        .map_err(|source| LaunchError::Worker {
            role,
            source: Arc::new(source),
        })
}
