//! Ctrl-C handling
//!
//! While an image file exists, a SIGINT must not kill gifflash outright:
//! the foreground child (spiffsgen or esptool) receives the same signal and
//! exits, and the pipeline then unwinds normally so the temporary image is
//! removed. Outside that window an interrupt exits immediately.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use gifflash_core::{Error, Result};

/// Shared interrupt state between the signal handler and the pipeline
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    armed: Arc<AtomicBool>,
    raised: Arc<AtomicBool>,
}

impl Interrupt {
    /// Create a disarmed, unraised interrupt
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver an interrupt
    ///
    /// Returns `false` when nothing is armed, in which case the caller
    /// should terminate the process itself.
    pub fn signal(&self) -> bool {
        if self.armed.load(Ordering::SeqCst) {
            self.raised.store(true, Ordering::SeqCst);
            true
        } else {
            false
        }
    }

    /// Absorb interrupts until the returned guard is dropped
    pub fn arm(&self) -> ArmGuard<'_> {
        self.armed.store(true, Ordering::SeqCst);
        ArmGuard { interrupt: self }
    }

    /// Check if an interrupt was delivered while armed
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    /// `Err(Error::Interrupted)` if an interrupt was delivered
    pub fn check(&self) -> Result<()> {
        if self.is_raised() {
            Err(Error::Interrupted)
        } else {
            Ok(())
        }
    }
}

/// Keeps an [`Interrupt`] armed while alive
#[derive(Debug)]
pub struct ArmGuard<'a> {
    interrupt: &'a Interrupt,
}

impl Drop for ArmGuard<'_> {
    fn drop(&mut self) {
        self.interrupt.armed.store(false, Ordering::SeqCst);
    }
}
