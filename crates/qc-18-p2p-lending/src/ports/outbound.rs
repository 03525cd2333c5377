//! # Outbound Ports
//!
//! Traits for external dependencies: time, value movement, notifications.

use crate::domain::value_objects::{Address, U256};
use crate::errors::TransferError;
use crate::events::LoanEvent;

/// Monotonic time source, read once per operation.
pub trait Clock: Send + Sync {
    /// Current Unix timestamp in seconds.
    fn now(&self) -> u64;
}

/// A single outgoing payment from the ledger's custody.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transfer {
    /// Recipient account.
    pub to: Address,
    /// Value sent.
    pub amount: U256,
}

impl Transfer {
    /// Create a transfer.
    #[must_use]
    pub fn new(to: Address, amount: U256) -> Self {
        Self { to, amount }
    }
}

/// Value transfer backend - outbound port.
///
/// `settle` is all-or-nothing: either every transfer in the batch lands, or
/// none does and an error is returned. Recipients may run code on receipt,
/// including calls back into the ledger.
pub trait ValueTransfer: Send + Sync {
    /// Deliver a batch of transfers.
    fn settle(&self, transfers: &[Transfer]) -> Result<(), TransferError>;
}

/// Notification sink - outbound port. Only called after commit.
pub trait EventSink: Send + Sync {
    /// Publish one committed event.
    fn publish(&self, event: &LoanEvent);
}
