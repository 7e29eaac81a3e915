//! Termination signal capture.
//!
//! SIGINT and SIGTERM only set flags so the picker survives them while a
//! script runs in the foreground. The event loop checks the flags between
//! events and the executor forwards a termination to the running child.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::debug;
use nrs_core::error::Result;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::flag;

#[derive(Debug, Clone, Default)]
pub struct SignalFlags {
    interrupt: Arc<AtomicBool>,
    terminate: Arc<AtomicBool>,
}

impl SignalFlags {
    /// Installs the handlers for SIGINT and SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns an error if a handler can't be registered.
    pub fn register() -> Result<Self> {
        let flags = SignalFlags::default();
        flag::register(SIGINT, Arc::clone(&flags.interrupt))?;
        flag::register(SIGTERM, Arc::clone(&flags.terminate))?;
        debug!("Signal handlers installed");
        Ok(flags)
    }

    pub fn terminate_flag(&self) -> &AtomicBool {
        &self.terminate
    }

    pub fn termination_requested(&self) -> bool {
        self.terminate.load(Ordering::Relaxed)
    }

    /// Whether a SIGINT arrived since the last call.
    pub fn take_interrupt(&self) -> bool {
        self.interrupt.swap(false, Ordering::Relaxed)
    }

    /// Whether the program should stop: any SIGTERM, or a fresh SIGINT.
    pub fn should_quit(&self) -> bool {
        self.take_interrupt() || self.termination_requested()
    }

    /// Drops a SIGINT that was meant for a foreground child.
    pub fn clear_interrupt(&self) {
        self.interrupt.store(false, Ordering::Relaxed);
    }

    /// Consumes a SIGTERM once it has been forwarded to a child.
    pub fn take_terminate(&self) -> bool {
        self.terminate.swap(false, Ordering::Relaxed)
    }

    #[cfg(test)]
    pub(crate) fn raise_terminate(&self) {
        self.terminate.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_start_clear() {
        let flags = SignalFlags::default();
        assert!(!flags.should_quit());
    }

    #[test]
    fn test_interrupt_is_consumed() {
        let flags = SignalFlags::default();
        flags.interrupt.store(true, Ordering::Relaxed);

        assert!(flags.take_interrupt());
        assert!(!flags.take_interrupt());
    }

    #[test]
    fn test_terminate_sticks() {
        let flags = SignalFlags::default();
        flags.terminate.store(true, Ordering::Relaxed);

        assert!(flags.should_quit());
        assert!(flags.should_quit());
        assert!(flags.terminate_flag().load(Ordering::Relaxed));
    }

    #[test]
    fn test_take_terminate_clears_quit() {
        let flags = SignalFlags::default();
        flags.raise_terminate();

        assert!(flags.take_terminate());
        assert!(!flags.take_terminate());
        assert!(!flags.should_quit());
    }

    #[test]
    fn test_clear_interrupt() {
        let flags = SignalFlags::default();
        flags.interrupt.store(true, Ordering::Relaxed);
        flags.clear_interrupt();
        assert!(!flags.should_quit());
    }
}
