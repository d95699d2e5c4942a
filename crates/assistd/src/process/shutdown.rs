//! Termination signal listeners.

use std::io;

use thiserror::Error;
use tracing::info;

use super::PROCESS_TARGET;

/// Blocks until the daemon should shut down.
#[cfg_attr(test, mockall::automock)]
pub trait ShutdownSignal: Send {
    /// Returns once shutdown should proceed.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError`] when the listener can no longer observe
    /// signals.
    fn wait(&mut self) -> Result<(), ShutdownError>;
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The listener stopped before any signal arrived.
    #[error("shutdown listener closed without a signal")]
    Closed,
}

#[cfg(unix)]
mod imp {
    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
    use signal_hook::iterator::Signals;

    use super::{PROCESS_TARGET, ShutdownError, ShutdownSignal, info};

    /// Listener for SIGTERM, SIGINT, SIGQUIT and SIGHUP.
    pub struct SystemShutdownSignal {
        signals: Signals,
    }

    impl SystemShutdownSignal {
        /// Registers the handlers; signals arriving from now on are queued.
        ///
        /// # Errors
        ///
        /// Returns [`ShutdownError::Install`] if registration fails.
        pub fn install() -> Result<Self, ShutdownError> {
            let signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
                .map_err(|source| ShutdownError::Install { source })?;
            Ok(Self { signals })
        }
    }

    impl ShutdownSignal for SystemShutdownSignal {
        fn wait(&mut self) -> Result<(), ShutdownError> {
            let signal = self.signals.forever().next().ok_or(ShutdownError::Closed)?;
            info!(target: PROCESS_TARGET, signal, "shutdown signal received");
            Ok(())
        }
    }
}

#[cfg(not(unix))]
mod imp {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::flag;

    use super::{PROCESS_TARGET, ShutdownError, ShutdownSignal, info};

    const POLL_INTERVAL: Duration = Duration::from_millis(100);

    /// Listener for SIGINT and SIGTERM.
    pub struct SystemShutdownSignal {
        raised: Arc<AtomicBool>,
    }

    impl SystemShutdownSignal {
        /// Registers the handlers.
        ///
        /// # Errors
        ///
        /// Returns [`ShutdownError::Install`] if registration fails.
        pub fn install() -> Result<Self, ShutdownError> {
            let raised = Arc::new(AtomicBool::new(false));
            for signal in [SIGINT, SIGTERM] {
                flag::register(signal, Arc::clone(&raised))
                    .map_err(|source| ShutdownError::Install { source })?;
            }
            Ok(Self { raised })
        }
    }

    impl ShutdownSignal for SystemShutdownSignal {
        fn wait(&mut self) -> Result<(), ShutdownError> {
            while !self.raised.load(Ordering::Acquire) {
                thread::sleep(POLL_INTERVAL);
            }
            info!(target: PROCESS_TARGET, "shutdown signal received");
            Ok(())
        }
    }
}

pub use imp::SystemShutdownSignal;
