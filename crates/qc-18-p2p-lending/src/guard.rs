//! # Value Transfer Guard
//!
//! Single-acquirer critical section around every state-mutating operation.
//!
//! This is a boolean lock, not a queue: `enter` fails immediately with
//! `LendingError::Reentrant` when the section is already held. The returned
//! `CriticalSection` releases the lock on drop, so every exit path (success,
//! `?` early return, unwinding) frees it.
//!
//! ```ignore
//! let _section = guard.enter()?;
//! // checks, then mutation, then value transfer
//! ```

use crate::errors::LendingError;
use std::sync::atomic::{AtomicBool, Ordering};

// =============================================================================
// GUARD
// =============================================================================

/// Non-reentrant lock owned by the ledger.
#[derive(Debug, Default)]
pub struct ValueTransferGuard {
    locked: AtomicBool,
}

impl ValueTransferGuard {
    /// Create an unlocked guard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the critical section.
    ///
    /// # Errors
    ///
    /// `Reentrant` if the section is already held.
    pub fn enter(&self) -> Result<CriticalSection<'_>, LendingError> {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map_err(|_| LendingError::Reentrant)?;
        Ok(CriticalSection { guard: self })
    }

    /// Returns true while an operation is in flight.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }
}

// =============================================================================
// CRITICAL SECTION TOKEN
// =============================================================================

/// Proof that the caller holds the guard. Released on drop.
#[derive(Debug)]
#[must_use = "the critical section is released as soon as the token is dropped"]
pub struct CriticalSection<'a> {
    guard: &'a ValueTransferGuard,
}

impl Drop for CriticalSection<'_> {
    fn drop(&mut self) {
        self.guard.locked.store(false, Ordering::Release);
    }
}

// =============================================================================
// TESTS
// =============================================================================
