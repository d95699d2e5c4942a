//! Lifecycle management for plugin child processes.
//!
//! The [`Supervisor`] owns a table of running plugins keyed by name. One
//! mutex guards the table and is the only exclusion between `start`, `stop`
//! and the exit watchers, so at most one process exists per plugin name.
//!
//! Every child gets three named worker threads:
//!
//! - a stdout reader that splits output into frames and queues them for the
//!   plugin's [`PluginChannel`];
//! - a stderr drain that logs each line at `debug`;
//! - an exit watcher that blocks in `wait`, records the exit and removes the
//!   table entry if it still belongs to the same start.
//!
//! None of them holds the table lock while blocked, and neither does
//! `start`: it reserves the name with a placeholder, spawns without the
//! lock and then installs the live entry.

mod exit;
mod signal;

use std::collections::HashMap;
use std::io::{self, BufRead, BufReader};
use std::path::{Component, Path, PathBuf};
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, SyncSender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, TryLockError};
use std::thread;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use self::exit::{ExitRecord, ExitSignal};
use self::signal::{FORCED_KILL_SUPPORTED, Killer, Termination};
use crate::channel::PluginChannel;
use crate::error::{ChannelError, StartError, StopError};
use crate::manifest::PluginManifest;
use crate::protocol::{Frame, FrameReader};

const SUPERVISOR_TARGET: &str = "assist_plugins::supervisor";

/// Default time a plugin gets to exit after a termination request.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Default time allowed for a forced kill to be confirmed.
pub const DEFAULT_KILL_CONFIRM: Duration = Duration::from_secs(5);

/// Timing policy for stopping plugins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// Wait after the graceful request before escalating to a kill.
    pub grace_period: Duration,
    /// Wait after a kill before reporting it unconfirmed.
    pub kill_confirm: Duration,
}

impl SupervisorConfig {
    /// Creates a policy from explicit durations.
    #[must_use]
    pub const fn new(grace_period: Duration, kill_confirm: Duration) -> Self {
        Self {
            grace_period,
            kill_confirm,
        }
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self::new(DEFAULT_GRACE_PERIOD, DEFAULT_KILL_CONFIRM)
    }
}

/// Lifecycle state of a supervised process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// Being spawned; not yet accepting requests.
    Starting,
    /// Accepting requests.
    Running,
    /// A stop is in progress.
    Stopping,
    /// Exit observed; the entry is about to be removed.
    Terminated,
}

/// Result of a successful [`Supervisor::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new process was spawned.
    Started {
        /// OS process id.
        pid: u32,
    },
    /// The plugin already had a process; nothing was spawned.
    AlreadyRunning {
        /// OS process id of the existing process.
        pid: u32,
    },
}

impl StartOutcome {
    /// Returns the pid of the plugin's process.
    #[must_use]
    pub const fn pid(self) -> u32 {
        match self {
            Self::Started { pid } | Self::AlreadyRunning { pid } => pid,
        }
    }
}

/// Result of a successful [`Supervisor::stop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The process exit was confirmed.
    Stopped {
        /// Exit code; `None` when ended by a signal.
        exit_code: Option<i32>,
    },
    /// No process was running for the plugin.
    NotRunning,
}

/// Aggregate result of [`Supervisor::shutdown_all`].
#[derive(Debug, Default)]
pub struct ShutdownReport {
    /// Plugins whose exit was confirmed.
    pub stopped: Vec<String>,
    /// Plugins that could not be stopped cleanly.
    pub failures: Vec<(String, StopError)>,
}

impl ShutdownReport {
    /// Returns `true` when every plugin stopped cleanly.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

type ProcessTable = HashMap<String, Slot>;

/// Table entry for one plugin name.
#[derive(Debug)]
enum Slot {
    /// A `start` holds the name while it spawns without the table lock.
    Starting,
    /// A spawned process.
    Live(ProcessEntry),
}

impl Slot {
    const fn live(&self) -> Option<&ProcessEntry> {
        match self {
            Self::Starting => None,
            Self::Live(entry) => Some(entry),
        }
    }

    const fn live_mut(&mut self) -> Option<&mut ProcessEntry> {
        match self {
            Self::Starting => None,
            Self::Live(entry) => Some(entry),
        }
    }

    fn is_generation(&self, generation: u64) -> bool {
        self.live().is_some_and(|entry| entry.generation == generation)
    }
}

#[derive(Debug)]
struct ProcessEntry {
    generation: u64,
    state: ProcessState,
    channel: Arc<Mutex<PluginChannel>>,
    exit: Arc<ExitSignal>,
    killer: Arc<Killer>,
}

impl ProcessEntry {
    fn pid(&self) -> u32 {
        self.killer.pid()
    }
}

/// Handles a stop needs after the table lock is released.
struct StopTarget {
    generation: u64,
    channel: Arc<Mutex<PluginChannel>>,
    exit: Arc<ExitSignal>,
    killer: Arc<Killer>,
}

impl StopTarget {
    fn pid(&self) -> u32 {
        self.killer.pid()
    }
}

/// Owner of all plugin child processes.
///
/// Dropping the supervisor stops whatever is still running.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
///
/// use assist_plugins::{PluginManifest, Supervisor, SupervisorConfig};
///
/// let supervisor = Supervisor::new(SupervisorConfig::default());
/// let manifest = PluginManifest::new("echo", Some("echo-plugin".into()));
/// supervisor
///     .start("echo", &manifest, Path::new("/opt/assist/plugins/echo"))
///     .expect("plugin starts");
/// let reply = supervisor
///     .send("echo", "echo", serde_json::json!({"text": "hi"}))
///     .expect("plugin replies");
/// println!("{reply}");
/// supervisor.stop("echo").expect("plugin stops");
/// ```
#[derive(Debug)]
pub struct Supervisor {
    config: SupervisorConfig,
    table: Arc<Mutex<ProcessTable>>,
    start_finished: Condvar,
    next_generation: AtomicU64,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new(SupervisorConfig::default())
    }
}

impl Supervisor {
    /// Creates an empty supervisor.
    #[must_use]
    pub fn new(config: SupervisorConfig) -> Self {
        Self {
            config,
            table: Arc::new(Mutex::new(HashMap::new())),
            start_finished: Condvar::new(),
            next_generation: AtomicU64::new(1),
        }
    }

    /// Returns the stop timing policy.
    #[must_use]
    pub const fn config(&self) -> SupervisorConfig {
        self.config
    }

    /// Spawns the plugin unless it is already running.
    ///
    /// The manifest's `executable` is resolved inside `plugin_dir`, which
    /// also becomes the child's working directory. All three standard
    /// streams are piped. A concurrent `start` of the same plugin waits for
    /// this one and then reports [`StartOutcome::AlreadyRunning`] or makes
    /// its own attempt if this one failed.
    ///
    /// # Errors
    ///
    /// Returns [`StartError`] when the executable is missing or escapes the
    /// plugin directory, the OS refuses the spawn, or a worker thread cannot
    /// be created. Failed spawns are not retried.
    pub fn start(
        &self,
        name: &str,
        manifest: &PluginManifest,
        plugin_dir: &Path,
    ) -> Result<StartOutcome, StartError> {
        if let Some(pid) = self.reserve(name) {
            debug!(target: SUPERVISOR_TARGET, plugin = name, pid, "plugin already running");
            return Ok(StartOutcome::AlreadyRunning { pid });
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let launched = resolve_executable(name, manifest, plugin_dir).and_then(|executable| {
            self.launch(name, generation, &executable, plugin_dir)
                .map(|entry| (executable, entry))
        });

        let mut table = lock_table(&self.table);
        let outcome = match launched {
            Ok((executable, mut entry)) => {
                let pid = entry.pid();
                if entry.exit.get().is_some() {
                    table.remove(name);
                    debug!(
                        target: SUPERVISOR_TARGET,
                        plugin = name,
                        pid,
                        "plugin exited during start"
                    );
                } else {
                    entry.state = ProcessState::Running;
                    table.insert(name.to_owned(), Slot::Live(entry));
                }
                info!(
                    target: SUPERVISOR_TARGET,
                    plugin = name,
                    pid,
                    executable = %executable.display(),
                    "plugin started"
                );
                Ok(StartOutcome::Started { pid })
            }
            Err(failure) => {
                table.remove(name);
                Err(failure)
            }
        };
        drop(table);
        self.start_finished.notify_all();
        outcome
    }

    /// Claims `name` for a start, waiting out any start already under way.
    ///
    /// Returns the pid of an existing process instead of claiming.
    fn reserve(&self, name: &str) -> Option<u32> {
        let mut table = lock_table(&self.table);
        loop {
            match table.get(name) {
                Some(Slot::Live(entry)) => return Some(entry.pid()),
                Some(Slot::Starting) => {
                    table = self
                        .start_finished
                        .wait(table)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                None => {
                    table.insert(name.to_owned(), Slot::Starting);
                    return None;
                }
            }
        }
    }

    /// Stops the plugin and waits for its exit to be confirmed.
    ///
    /// The plugin's stdin is closed if no request is in flight and SIGTERM
    /// is sent. After the grace period SIGKILL follows, or
    /// `TerminateProcess` on Windows. The table entry is
    /// removed whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`StopError::Signal`] if a signal cannot be delivered,
    /// [`StopError::KillUnconfirmed`] if the process outlives the kill
    /// window and [`StopError::Unsupported`] where forced kills are not
    /// available.
    pub fn stop(&self, name: &str) -> Result<StopOutcome, StopError> {
        let Some(target) = self.begin_stop(name) else {
            debug!(target: SUPERVISOR_TARGET, plugin = name, "stop requested for idle plugin");
            return Ok(StopOutcome::NotRunning);
        };
        let outcome = self.terminate(name, &target);
        self.purge(name, target.generation);
        outcome
    }

    /// Stops every running plugin concurrently and reports per-plugin
    /// failures without aborting.
    #[must_use]
    pub fn shutdown_all(&self) -> ShutdownReport {
        let names = self.running();
        if names.is_empty() {
            return ShutdownReport::default();
        }
        info!(
            target: SUPERVISOR_TARGET,
            plugins = names.len(),
            "stopping all plugins"
        );

        let outcomes = thread::scope(|scope| {
            let handles: Vec<_> = names
                .into_iter()
                .map(|name| {
                    scope.spawn(move || {
                        let outcome = self.stop(&name);
                        (name, outcome)
                    })
                })
                .collect();
            handles
                .into_iter()
                .filter_map(|handle| handle.join().ok())
                .collect::<Vec<_>>()
        });

        let mut report = ShutdownReport::default();
        for (name, outcome) in outcomes {
            match outcome {
                Ok(StopOutcome::Stopped { .. }) => report.stopped.push(name),
                Ok(StopOutcome::NotRunning) => {}
                Err(failure) => {
                    warn!(
                        target: SUPERVISOR_TARGET,
                        plugin = %name,
                        error = %failure,
                        "plugin did not stop cleanly"
                    );
                    report.failures.push((name, failure));
                }
            }
        }
        info!(
            target: SUPERVISOR_TARGET,
            stopped = report.stopped.len(),
            failed = report.failures.len(),
            "plugin shutdown complete"
        );
        report
    }

    /// Returns whether the plugin has a live process.
    #[must_use]
    pub fn is_running(&self, name: &str) -> bool {
        lock_table(&self.table)
            .get(name)
            .and_then(Slot::live)
            .is_some_and(|entry| entry.exit.get().is_none())
    }

    /// Returns the names of supervised plugins, sorted. Plugins still
    /// being spawned are not included.
    #[must_use]
    pub fn running(&self) -> Vec<String> {
        let mut names: Vec<String> = lock_table(&self.table)
            .iter()
            .filter(|(_, slot)| slot.live().is_some())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort_unstable();
        names
    }

    /// Returns the plugin's lifecycle state, or `None` if it has no entry.
    #[must_use]
    pub fn state(&self, name: &str) -> Option<ProcessState> {
        lock_table(&self.table).get(name).map(|slot| match slot {
            Slot::Starting => ProcessState::Starting,
            Slot::Live(entry) if entry.exit.get().is_some() => ProcessState::Terminated,
            Slot::Live(entry) => entry.state,
        })
    }

    /// Returns the plugin's process id.
    #[must_use]
    pub fn pid(&self, name: &str) -> Option<u32> {
        lock_table(&self.table)
            .get(name)
            .and_then(Slot::live)
            .map(ProcessEntry::pid)
    }

    /// Sends one request to a running plugin and returns its reply.
    ///
    /// Requests to the same plugin queue behind each other; different
    /// plugins proceed independently.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::NotRunning`] if the plugin has no running
    /// process, otherwise any error from [`PluginChannel::send`].
    pub fn send(&self, name: &str, function: &str, params: Value) -> Result<Value, ChannelError> {
        let channel = self.channel(name)?;
        let mut guard = channel.lock().unwrap_or_else(PoisonError::into_inner);
        guard.send(function, params)
    }

    /// Sends one request and collects a streamed reply.
    ///
    /// # Errors
    ///
    /// As [`Supervisor::send`].
    pub fn send_streaming(
        &self,
        name: &str,
        function: &str,
        params: Value,
    ) -> Result<Vec<Value>, ChannelError> {
        let channel = self.channel(name)?;
        let mut guard = channel.lock().unwrap_or_else(PoisonError::into_inner);
        guard.send_streaming(function, params)
    }

    fn channel(&self, name: &str) -> Result<Arc<Mutex<PluginChannel>>, ChannelError> {
        lock_table(&self.table)
            .get(name)
            .and_then(Slot::live)
            .filter(|entry| entry.state == ProcessState::Running)
            .map(|entry| Arc::clone(&entry.channel))
            .ok_or_else(|| ChannelError::NotRunning {
                name: name.to_owned(),
                source: None,
            })
    }

    fn launch(
        &self,
        name: &str,
        generation: u64,
        executable: &Path,
        plugin_dir: &Path,
    ) -> Result<ProcessEntry, StartError> {
        let mut child = Command::new(executable)
            .current_dir(plugin_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| StartError::Spawn {
                name: name.to_owned(),
                source: Arc::new(source),
            })?;
        let killer = match Killer::new(&child) {
            Ok(killer) => Arc::new(killer),
            Err(source) => {
                abandon(name, &mut child);
                return Err(StartError::Spawn {
                    name: name.to_owned(),
                    source: Arc::new(source),
                });
            }
        };

        let exit = Arc::new(ExitSignal::default());
        let (handoff, watched) = mpsc::sync_channel::<Child>(1);
        let (stdin, replies) = match self.attach_workers(name, generation, &mut child, watched, &exit)
        {
            Ok(ends) => ends,
            Err(failure) => {
                abandon(name, &mut child);
                return Err(failure);
            }
        };
        hand_off(name, &handoff, child)?;

        Ok(ProcessEntry {
            generation,
            state: ProcessState::Starting,
            channel: Arc::new(Mutex::new(PluginChannel::new(
                name.to_owned(),
                stdin,
                replies,
            ))),
            exit,
            killer,
        })
    }

    fn attach_workers(
        &self,
        name: &str,
        generation: u64,
        child: &mut Child,
        watched: Receiver<Child>,
        exit: &Arc<ExitSignal>,
    ) -> Result<(ChildStdin, Receiver<Frame>), StartError> {
        let stdin = child.stdin.take().ok_or_else(|| missing_pipe(name, "stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing_pipe(name, "stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| missing_pipe(name, "stderr"))?;

        let watcher = ExitWatcher {
            table: Arc::clone(&self.table),
            name: name.to_owned(),
            generation,
            pid: child.id(),
            exit: Arc::clone(exit),
        };
        spawn_worker(name, "exit", move || watcher.run(&watched))?;

        let (frames, replies) = mpsc::channel();
        let reader_name = name.to_owned();
        spawn_worker(name, "stdout", move || pump_stdout(&reader_name, stdout, &frames))?;

        let drain_name = name.to_owned();
        spawn_worker(name, "stderr", move || drain_stderr(&drain_name, stderr))?;

        Ok((stdin, replies))
    }

    fn begin_stop(&self, name: &str) -> Option<StopTarget> {
        let mut table = lock_table(&self.table);
        let entry = table.get_mut(name)?.live_mut()?;
        entry.state = ProcessState::Stopping;
        Some(StopTarget {
            generation: entry.generation,
            channel: Arc::clone(&entry.channel),
            exit: Arc::clone(&entry.exit),
            killer: Arc::clone(&entry.killer),
        })
    }

    fn terminate(&self, name: &str, target: &StopTarget) -> Result<StopOutcome, StopError> {
        info!(target: SUPERVISOR_TARGET, plugin = name, pid = target.pid(), "stopping plugin");
        request_exit(name, target, Termination::Graceful)?;
        if let Some(record) = target.exit.wait_timeout(self.config.grace_period) {
            return Ok(stopped(name, target.pid(), record));
        }

        warn!(
            target: SUPERVISOR_TARGET,
            plugin = name,
            pid = target.pid(),
            grace_ms = u64::try_from(self.config.grace_period.as_millis()).unwrap_or(u64::MAX),
            "plugin ignored termination request; killing"
        );
        request_exit(name, target, Termination::Forced)?;
        if let Some(record) = target.exit.wait_timeout(self.config.kill_confirm) {
            return Ok(stopped(name, target.pid(), record));
        }

        error!(
            target: SUPERVISOR_TARGET,
            plugin = name,
            pid = target.pid(),
            "forced kill not confirmed; the process may still be alive"
        );
        Err(StopError::KillUnconfirmed {
            name: name.to_owned(),
            waited_ms: self.config.kill_confirm.as_millis(),
        })
    }

    fn purge(&self, name: &str, generation: u64) {
        let mut table = lock_table(&self.table);
        if table.get(name).is_some_and(|slot| slot.is_generation(generation)) {
            table.remove(name);
        }
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        if self.running().is_empty() {
            return;
        }
        let report = self.shutdown_all();
        if !report.is_clean() {
            warn!(
                target: SUPERVISOR_TARGET,
                failed = report.failures.len(),
                "some plugins survived supervisor shutdown"
            );
        }
    }
}

fn lock_table(table: &Mutex<ProcessTable>) -> MutexGuard<'_, ProcessTable> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

fn resolve_executable(
    name: &str,
    manifest: &PluginManifest,
    plugin_dir: &Path,
) -> Result<PathBuf, StartError> {
    let Some(relative) = manifest.executable() else {
        return Err(StartError::ExecutableMissing {
            name: name.to_owned(),
            path: None,
        });
    };
    let confined = relative
        .components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
    if relative.as_os_str().is_empty() || !confined {
        return Err(StartError::ExecutableOutsidePluginDir {
            name: name.to_owned(),
            executable: relative.to_path_buf(),
        });
    }
    let path = plugin_dir.join(relative);
    if !path.is_file() {
        return Err(StartError::ExecutableMissing {
            name: name.to_owned(),
            path: Some(path),
        });
    }
    Ok(path)
}

fn missing_pipe(name: &str, stream: &'static str) -> StartError {
    StartError::PipeUnavailable {
        name: name.to_owned(),
        stream,
    }
}

fn spawn_worker(
    name: &str,
    role: &'static str,
    body: impl FnOnce() + Send + 'static,
) -> Result<(), StartError> {
    thread::Builder::new()
        .name(format!("plugin-{name}-{role}"))
        .spawn(body)
        .map(drop)
        .map_err(|source| StartError::Worker {
            name: name.to_owned(),
            role,
            source: Arc::new(source),
        })
}

fn hand_off(name: &str, handoff: &SyncSender<Child>, child: Child) -> Result<(), StartError> {
    handoff.send(child).map_err(|mpsc::SendError(mut orphan)| {
        abandon(name, &mut orphan);
        StartError::Worker {
            name: name.to_owned(),
            role: "exit",
            source: Arc::new(io::Error::other("exit watcher stopped before the child was handed over")),
        }
    })
}

fn abandon(name: &str, child: &mut Child) {
    if let Err(error) = child.kill() {
        debug!(target: SUPERVISOR_TARGET, plugin = name, %error, "kill after failed start");
    }
    if let Err(error) = child.wait() {
        debug!(target: SUPERVISOR_TARGET, plugin = name, %error, "reap after failed start");
    }
}

fn request_exit(name: &str, target: &StopTarget, termination: Termination) -> Result<(), StopError> {
    if termination == Termination::Graceful {
        close_idle_input(name, &target.channel);
    }
    if termination == Termination::Forced && !FORCED_KILL_SUPPORTED {
        return Err(StopError::Unsupported {
            name: name.to_owned(),
        });
    }
    match target
        .exit
        .unless_exited(|| target.killer.deliver(termination))
    {
        None | Some(Ok(())) => Ok(()),
        Some(Err(source)) => Err(StopError::Signal {
            name: name.to_owned(),
            signal: termination.label(),
            source: Arc::new(source),
        }),
    }
}

fn close_idle_input(name: &str, channel: &Mutex<PluginChannel>) {
    match channel.try_lock() {
        Ok(mut guard) => guard.close_input(),
        Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().close_input(),
        Err(TryLockError::WouldBlock) => debug!(
            target: SUPERVISOR_TARGET,
            plugin = name,
            "request in flight; leaving stdin open"
        ),
    }
}

fn stopped(name: &str, pid: u32, record: ExitRecord) -> StopOutcome {
    info!(
        target: SUPERVISOR_TARGET,
        plugin = name,
        pid,
        exit_code = ?record.code,
        "plugin stopped"
    );
    StopOutcome::Stopped {
        exit_code: record.code,
    }
}

struct ExitWatcher {
    table: Arc<Mutex<ProcessTable>>,
    name: String,
    generation: u64,
    pid: u32,
    exit: Arc<ExitSignal>,
}

impl ExitWatcher {
    fn run(self, watched: &Receiver<Child>) {
        let Ok(mut child) = watched.recv() else {
            return;
        };
        let code = match child.wait() {
            Ok(status) => status.code(),
            Err(error) => {
                warn!(
                    target: SUPERVISOR_TARGET,
                    plugin = %self.name,
                    pid = self.pid,
                    %error,
                    "failed to wait for plugin exit"
                );
                None
            }
        };
        self.exit.record(ExitRecord { code });

        let removed = {
            let mut table = lock_table(&self.table);
            let current = table
                .get(&self.name)
                .is_some_and(|slot| slot.is_generation(self.generation));
            if current {
                table.remove(&self.name);
            }
            current
        };
        info!(
            target: SUPERVISOR_TARGET,
            plugin = %self.name,
            pid = self.pid,
            exit_code = ?code,
            removed,
            "plugin process exited"
        );
    }
}

fn pump_stdout(name: &str, stdout: ChildStdout, frames: &Sender<Frame>) {
    for item in FrameReader::new(stdout) {
        match item {
            Ok(frame) => {
                debug!(
                    target: SUPERVISOR_TARGET,
                    plugin = name,
                    terminal = frame.terminal,
                    payload = %frame.payload,
                    "plugin output"
                );
                if frames.send(frame).is_err() {
                    break;
                }
            }
            Err(error) => {
                warn!(target: SUPERVISOR_TARGET, plugin = name, %error, "plugin stdout read failed");
                break;
            }
        }
    }
    debug!(target: SUPERVISOR_TARGET, plugin = name, "plugin stdout closed");
}

fn drain_stderr(name: &str, stderr: ChildStderr) {
    for chunk in BufReader::new(stderr).split(b'\n') {
        match chunk {
            Ok(bytes) => {
                let text = String::from_utf8_lossy(&bytes);
                let line = text.trim_end();
                if !line.is_empty() {
                    debug!(target: SUPERVISOR_TARGET, plugin = name, stderr = line, "plugin stderr");
                }
            }
            Err(error) => {
                debug!(target: SUPERVISOR_TARGET, plugin = name, %error, "plugin stderr read failed");
                break;
            }
        }
    }
}
