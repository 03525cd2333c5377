//! In-Memory Bank Adapter
//!
//! Implements `ValueTransfer` over an in-memory balance table.
//!
//! Recipients can register a hook that runs when value arrives, standing in
//! for code executed on receipt. A hook may call back into the ledger or
//! refuse the payment. Hooks run with no bank lock held.

use crate::domain::value_objects::{Address, U256};
use crate::errors::TransferError;
use crate::ports::outbound::{Transfer, ValueTransfer};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Code run when a recipient receives value. An `Err` aborts the whole batch.
pub type RecipientHook = Arc<dyn Fn(&Transfer) -> Result<(), TransferError> + Send + Sync>;

/// In-memory balances with all-or-nothing batch settlement.
#[derive(Default)]
pub struct InMemoryBank {
    balances: RwLock<HashMap<Address, U256>>,
    hooks: RwLock<HashMap<Address, RecipientHook>>,
}

impl InMemoryBank {
    /// Create an empty bank.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current balance (zero for unknown accounts).
    #[must_use]
    pub fn balance_of(&self, account: &Address) -> U256 {
        self.balances
            .read()
            .get(account)
            .copied()
            .unwrap_or_default()
    }

    /// Register code to run whenever `account` receives value.
    pub fn register_hook(&self, account: Address, hook: RecipientHook) {
        self.hooks.write().insert(account, hook);
    }

    /// Make `account` refuse every incoming transfer.
    pub fn reject_incoming(&self, account: Address) {
        self.register_hook(
            account,
            Arc::new(move |_: &Transfer| Err(TransferError::Rejected(account))),
        );
    }

    /// Remove any hook for `account`.
    pub fn clear_hook(&self, account: &Address) {
        self.hooks.write().remove(account);
    }

    fn credit(&self, transfer: &Transfer) -> Result<(), TransferError> {
        let mut balances = self.balances.write();
        let balance = balances.entry(transfer.to).or_default();
        *balance = balance
            .checked_add(transfer.amount)
            .ok_or(TransferError::Overflow(transfer.to))?;
        Ok(())
    }

    fn hook_for(&self, account: &Address) -> Option<RecipientHook> {
        self.hooks.read().get(account).cloned()
    }

    fn deliver(&self, transfers: &[Transfer]) -> Result<(), TransferError> {
        for transfer in transfers {
            self.credit(transfer)?;
            if let Some(hook) = self.hook_for(&transfer.to) {
                hook(transfer)?;
            }
            debug!(
                "[qc-18] Credited {} to {}",
                transfer.amount, transfer.to
            );
        }
        Ok(())
    }
}

/// Balances before a batch. Restored on drop unless the batch completed,
/// so a panicking hook reverts the batch too.
struct BalanceSnapshot<'a> {
    balances: &'a RwLock<HashMap<Address, U256>>,
    saved: Option<HashMap<Address, U256>>,
}

impl<'a> BalanceSnapshot<'a> {
    fn take(balances: &'a RwLock<HashMap<Address, U256>>) -> Self {
        let saved = Some(balances.read().clone());
        Self { balances, saved }
    }

    fn release(mut self) {
        self.saved = None;
    }
}

impl Drop for BalanceSnapshot<'_> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            *self.balances.write() = saved;
        }
    }
}

impl ValueTransfer for InMemoryBank {
    fn settle(&self, transfers: &[Transfer]) -> Result<(), TransferError> {
        let snapshot = BalanceSnapshot::take(&self.balances);

        match self.deliver(transfers) {
            Ok(()) => {
                snapshot.release();
                Ok(())
            }
            Err(err) => {
                drop(snapshot);
                warn!("[qc-18] Settlement of {} transfers reverted: {}", transfers.len(), err);
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for InMemoryBank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBank")
            .field("accounts", &self.balances.read().len())
            .field("hooks", &self.hooks.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ALICE: Address = Address::new([1u8; 20]);
    const BOB: Address = Address::new([2u8; 20]);

    #[test]
    fn test_settle_credits_all() {
        let bank = InMemoryBank::new();
        bank.settle(&[
            Transfer::new(ALICE, U256::from(10)),
            Transfer::new(BOB, U256::from(5)),
            Transfer::new(ALICE, U256::from(1)),
        ])
        .unwrap();

        assert_eq!(bank.balance_of(&ALICE), U256::from(11));
        assert_eq!(bank.balance_of(&BOB), U256::from(5));
    }

    #[test]
    fn test_rejecting_recipient_reverts_batch() {
        let bank = InMemoryBank::new();
        bank.settle(&[Transfer::new(ALICE, U256::from(3))]).unwrap();
        bank.reject_incoming(BOB);

        let result = bank.settle(&[
            Transfer::new(ALICE, U256::from(10)),
            Transfer::new(BOB, U256::from(5)),
        ]);

        assert_eq!(result, Err(TransferError::Rejected(BOB)));
        assert_eq!(bank.balance_of(&ALICE), U256::from(3));
        assert_eq!(bank.balance_of(&BOB), U256::zero());
    }

    #[test]
    fn test_overflow_reverts_batch() {
        let bank = InMemoryBank::new();
        bank.settle(&[Transfer::new(BOB, U256::MAX)]).unwrap();

        let result = bank.settle(&[
            Transfer::new(ALICE, U256::from(1)),
            Transfer::new(BOB, U256::from(1)),
        ]);

        assert_eq!(result, Err(TransferError::Overflow(BOB)));
        assert_eq!(bank.balance_of(&ALICE), U256::zero());
    }

    #[test]
    fn test_hook_runs_after_credit_without_lock() {
        let bank = Arc::new(InMemoryBank::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let seen = Arc::clone(&calls);
        let inner = Arc::clone(&bank);
        bank.register_hook(
            ALICE,
            Arc::new(move |transfer: &Transfer| {
                // Reading the bank from inside a hook must not deadlock.
                assert_eq!(inner.balance_of(&transfer.to), transfer.amount);
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );

        bank.settle(&[Transfer::new(ALICE, U256::from(7))]).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        bank.clear_hook(&ALICE);
        bank.settle(&[Transfer::new(ALICE, U256::from(1))]).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_hook_reverts_batch() {
        let bank = InMemoryBank::new();
        bank.settle(&[Transfer::new(ALICE, U256::from(4))]).unwrap();
        bank.register_hook(BOB, Arc::new(|_: &Transfer| panic!("recipient aborted")));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            bank.settle(&[
                Transfer::new(ALICE, U256::from(10)),
                Transfer::new(BOB, U256::from(5)),
            ])
        }));

        assert!(result.is_err());
        assert_eq!(bank.balance_of(&ALICE), U256::from(4));
        assert_eq!(bank.balance_of(&BOB), U256::zero());
    }
}
