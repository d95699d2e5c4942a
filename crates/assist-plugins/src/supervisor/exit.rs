//! One-shot exit notification shared by a child's watcher and its stoppers.

use std::io;
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

/// Exit observed by the watcher thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ExitRecord {
    /// Exit code, absent when the process was ended by a signal.
    pub(crate) code: Option<i32>,
}

/// Latch set exactly once when the process exits.
#[derive(Debug, Default)]
pub(crate) struct ExitSignal {
    record: Mutex<Option<ExitRecord>>,
    exited: Condvar,
}

impl ExitSignal {
    pub(crate) fn record(&self, record: ExitRecord) {
        let mut slot = self.record.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(record);
        }
        self.exited.notify_all();
    }

    pub(crate) fn get(&self) -> Option<ExitRecord> {
        *self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks until the exit is recorded or `timeout` elapses.
    pub(crate) fn wait_timeout(&self, timeout: Duration) -> Option<ExitRecord> {
        let slot = self.record.lock().unwrap_or_else(PoisonError::into_inner);
        let (slot, _) = self
            .exited
            .wait_timeout_while(slot, timeout, |record| record.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        *slot
    }

    /// Runs `deliver` unless the exit is already recorded.
    ///
    /// The latch stays locked while `deliver` runs, so a signal is never
    /// sent to a pid whose exit the watcher has already recorded.
    pub(crate) fn unless_exited(
        &self,
        deliver: impl FnOnce() -> io::Result<()>,
    ) -> Option<io::Result<()>> {
        let slot = self.record.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return None;
        }
        let outcome = deliver();
        drop(slot);
        Some(outcome)
    }
}
