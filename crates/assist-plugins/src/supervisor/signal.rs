//! Platform termination primitives.
//!
//! On unix both requests are signals sent to the pid. On Windows the
//! graceful request is the stdin closure done by the caller, and a forced
//! kill calls `TerminateProcess` through a handle duplicated from the
//! child at spawn time, so it can never hit a recycled pid.

use std::io;
#[cfg(windows)]
use std::os::windows::io::{AsHandle, AsRawHandle, OwnedHandle};
use std::process::Child;

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::sys::signal::{Signal, kill};
#[cfg(unix)]
use nix::unistd::Pid;

/// How a stop request asks a process to exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Termination {
    /// Polite request the process may handle.
    Graceful,
    /// Uncatchable kill.
    Forced,
}

impl Termination {
    #[cfg(not(windows))]
    pub(crate) const fn label(self) -> &'static str {
        match self {
            Self::Graceful => "SIGTERM",
            Self::Forced => "SIGKILL",
        }
    }

    #[cfg(windows)]
    pub(crate) const fn label(self) -> &'static str {
        match self {
            Self::Graceful => "stdin close",
            Self::Forced => "TerminateProcess",
        }
    }
}

/// Whether this platform can kill a process that ignores the graceful
/// request.
pub(crate) const FORCED_KILL_SUPPORTED: bool = cfg!(any(unix, windows));

/// Target for termination requests, taken from the child before the exit
/// watcher takes ownership of it.
#[derive(Debug)]
pub(crate) struct Killer {
    pid: u32,
    #[cfg(windows)]
    process: OwnedHandle,
}

impl Killer {
    /// Captures what is needed to terminate `child` later.
    ///
    /// # Errors
    ///
    /// Fails on Windows when the process handle cannot be duplicated.
    pub(crate) fn new(child: &Child) -> io::Result<Self> {
        Ok(Self {
            pid: child.id(),
            #[cfg(windows)]
            process: child.as_handle().try_clone_to_owned()?,
        })
    }

    pub(crate) const fn pid(&self) -> u32 {
        self.pid
    }

    /// Delivers `termination`. A process that is already gone counts as
    /// delivered.
    #[cfg(unix)]
    pub(crate) fn deliver(&self, termination: Termination) -> io::Result<()> {
        let raw = i32::try_from(self.pid)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
        let signal = match termination {
            Termination::Graceful => Signal::SIGTERM,
            Termination::Forced => Signal::SIGKILL,
        };
        match kill(Pid::from_raw(raw), signal) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(errno) => Err(io::Error::from(errno)),
        }
    }

    /// Delivers `termination`. The graceful request has no Windows
    /// counterpart beyond closing stdin, which the caller has done.
    #[cfg(windows)]
    pub(crate) fn deliver(&self, termination: Termination) -> io::Result<()> {
        use windows_sys::Win32::Foundation::ERROR_ACCESS_DENIED;
        use windows_sys::Win32::System::Threading::TerminateProcess;

        if termination == Termination::Graceful {
            return Ok(());
        }
        // SAFETY: `process` is an owned, open process handle for the whole
        // call; `TerminateProcess` neither closes nor retains it.
        let terminated = unsafe { TerminateProcess(self.process.as_raw_handle(), 1) };
        if terminated != 0 {
            return Ok(());
        }
        let error = io::Error::last_os_error();
        // A process that has already exited refuses termination with
        // ERROR_ACCESS_DENIED.
        if error.raw_os_error() == i32::try_from(ERROR_ACCESS_DENIED).ok() {
            return Ok(());
        }
        Err(error)
    }

    /// Only the graceful request is available here; callers check
    /// [`FORCED_KILL_SUPPORTED`] before asking for a forced kill.
    #[cfg(not(any(unix, windows)))]
    pub(crate) fn deliver(&self, termination: Termination) -> io::Result<()> {
        match termination {
            Termination::Graceful => Ok(()),
            Termination::Forced => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "forced termination is not available on this platform",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::process::{Command, Stdio};

    use super::*;

    fn sleeper() -> Child {
        #[cfg(windows)]
        let mut command = {
            let mut command = Command::new("cmd");
            command.args(["/C", "ping -n 30 127.0.0.1 >NUL"]);
            command
        };
        #[cfg(not(windows))]
        let mut command = {
            let mut command = Command::new("sh");
            command.args(["-c", "sleep 30"]);
            command
        };
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn sleeper")
    }

    #[cfg(any(unix, windows))]
    #[test]
    fn forced_kill_ends_a_running_child() {
        let mut child = sleeper();
        let killer = Killer::new(&child).expect("capture killer");
        assert_eq!(killer.pid(), child.id());

        killer.deliver(Termination::Forced).expect("forced kill");
        let status = child.wait().expect("reap child");
        assert!(!status.success());
    }

    #[cfg(windows)]
    #[test]
    fn forced_kill_after_exit_is_not_an_error() {
        let mut child = sleeper();
        let killer = Killer::new(&child).expect("capture killer");
        killer.deliver(Termination::Forced).expect("first kill");
        child.wait().expect("reap child");
        assert!(killer.deliver(Termination::Forced).is_ok());
    }

    #[test]
    fn graceful_then_forced_requests_are_both_delivered() {
        let mut child = sleeper();
        let killer = Killer::new(&child).expect("capture killer");
        killer.deliver(Termination::Graceful).expect("graceful request");
        if FORCED_KILL_SUPPORTED {
            killer.deliver(Termination::Forced).expect("forced kill");
        } else {
            child.kill().expect("kill through std");
        }
        child.wait().expect("reap child");
    }
}
