//! # Loan Registry
//!
//! Append-only arena of loans addressed by dense, monotonically increasing
//! `LoanId`s, plus borrower and lender indices. Pure data access: no business
//! rules live here, callers validate transitions before calling `update`.
//!
//! ## Journal
//!
//! While a transaction is open (`begin` .. `commit` / `rollback`), every
//! mutation is journaled so that `rollback` restores the registry exactly,
//! including the id counter and both indices.

use super::entities::{Loan, LoanParams};
use super::value_objects::{Address, LoanId};
use crate::errors::LendingError;
use std::collections::HashMap;

/// Undo record for a single registry mutation.
#[derive(Clone, Debug)]
enum JournalEntry {
    /// A loan was appended (undo: pop it and its borrower index entry).
    Created(LoanId),
    /// A loan was mutated (undo: restore the previous value).
    Updated(Loan),
    /// A lender index entry was appended (undo: pop it).
    LenderIndexed(Address),
}

/// Authoritative store of loans.
#[derive(Debug, Default)]
pub struct LoanRegistry {
    /// Loan with id `n` lives at index `n - 1`.
    loans: Vec<Loan>,
    /// Borrower -> loans requested, in creation order.
    by_borrower: HashMap<Address, Vec<LoanId>>,
    /// Lender -> loans funded, in funding order.
    by_lender: HashMap<Address, Vec<LoanId>>,
    /// Open transaction journal.
    journal: Option<Vec<JournalEntry>>,
}

impl LoanRegistry {
    /// Create an empty registry. The first loan will get id 1.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next id and store a new loan in `Requested` state.
    ///
    /// No validation happens here.
    pub fn create_loan(&mut self, params: LoanParams) -> LoanId {
        let id = self.next_id();
        let borrower = params.borrower;
        self.loans.push(Loan::new(id, params));
        self.by_borrower.entry(borrower).or_default().push(id);
        self.record(JournalEntry::Created(id));
        id
    }

    /// Fetch a loan.
    ///
    /// # Errors
    ///
    /// `NotFound` for id 0 or any id beyond the current counter.
    pub fn get(&self, id: LoanId) -> Result<&Loan, LendingError> {
        Self::slot(id)
            .and_then(|index| self.loans.get(index))
            .ok_or(LendingError::NotFound(id))
    }

    /// Apply an in-place mutation. The caller has already validated it.
    ///
    /// # Errors
    ///
    /// `NotFound` if the loan does not exist.
    pub fn update<F>(&mut self, id: LoanId, mutator: F) -> Result<(), LendingError>
    where
        F: FnOnce(&mut Loan),
    {
        let index = Self::slot(id)
            .filter(|index| *index < self.loans.len())
            .ok_or(LendingError::NotFound(id))?;

        if self.journal.is_some() {
            let before = self.loans[index].clone();
            self.record(JournalEntry::Updated(before));
        }
        mutator(&mut self.loans[index]);
        Ok(())
    }

    /// Append `id` to the lender's index.
    pub fn index_lender(&mut self, lender: Address, id: LoanId) {
        self.by_lender.entry(lender).or_default().push(id);
        self.record(JournalEntry::LenderIndexed(lender));
    }

    /// Loans requested by `borrower`, oldest first.
    #[must_use]
    pub fn loans_of_borrower(&self, borrower: &Address) -> &[LoanId] {
        self.by_borrower.get(borrower).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Loans funded by `lender`, oldest first.
    #[must_use]
    pub fn loans_of_lender(&self, lender: &Address) -> &[LoanId] {
        self.by_lender.get(lender).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The id the next `create_loan` will return.
    #[must_use]
    pub fn next_id(&self) -> LoanId {
        LoanId(LoanId::FIRST.get() + self.loans.len() as u64)
    }

    /// Number of loans ever created.
    #[must_use]
    pub fn len(&self) -> usize {
        self.loans.len()
    }

    /// Returns true if no loan was ever created.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loans.is_empty()
    }

    /// All loans in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Loan> {
        self.loans.iter()
    }

    // =========================================================================
    // TRANSACTION JOURNAL
    // =========================================================================

    /// Open a transaction. Any journal left open is discarded.
    pub fn begin(&mut self) {
        self.journal = Some(Vec::new());
    }

    /// Keep all mutations since `begin`.
    pub fn commit(&mut self) {
        self.journal = None;
    }

    /// Undo all mutations since `begin`, newest first.
    pub fn rollback(&mut self) {
        let Some(entries) = self.journal.take() else {
            return;
        };

        for entry in entries.into_iter().rev() {
            match entry {
                JournalEntry::Created(id) => {
                    if let Some(loan) = self.loans.pop() {
                        debug_assert_eq!(loan.id, id);
                        Self::pop_index(&mut self.by_borrower, &loan.borrower);
                    }
                }
                JournalEntry::Updated(before) => {
                    if let Some(index) = Self::slot(before.id) {
                        if let Some(slot) = self.loans.get_mut(index) {
                            *slot = before;
                        }
                    }
                }
                JournalEntry::LenderIndexed(lender) => {
                    Self::pop_index(&mut self.by_lender, &lender);
                }
            }
        }
    }

    /// Returns true while a transaction is open.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.journal.is_some()
    }

    fn record(&mut self, entry: JournalEntry) {
        if let Some(journal) = self.journal.as_mut() {
            journal.push(entry);
        }
    }

    fn pop_index(index: &mut HashMap<Address, Vec<LoanId>>, key: &Address) {
        if let Some(ids) = index.get_mut(key) {
            ids.pop();
            if ids.is_empty() {
                index.remove(key);
            }
        }
    }

    /// Arena slot for an id (`None` for id 0).
    fn slot(id: LoanId) -> Option<usize> {
        usize::try_from(id.0).ok()?.checked_sub(1)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{LoanState, U256};

    fn params(borrower: u8) -> LoanParams {
        LoanParams {
            borrower: Address::new([borrower; 20]),
            collateral_amount: U256::from(200),
            loan_amount: U256::from(100),
            interest_rate: 5,
            interest: U256::from(1),
            due_date: 1_000,
        }
    }

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let mut registry = LoanRegistry::new();
        assert_eq!(registry.next_id(), LoanId(1));

        let first = registry.create_loan(params(1));
        let second = registry.create_loan(params(1));
        let third = registry.create_loan(params(2));

        assert_eq!(first, LoanId(1));
        assert_eq!(second, LoanId(2));
        assert_eq!(third, LoanId(3));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_get_rejects_zero_and_out_of_range() {
        let mut registry = LoanRegistry::new();
        registry.create_loan(params(1));

        assert!(matches!(registry.get(LoanId(0)), Err(LendingError::NotFound(LoanId(0)))));
        assert!(matches!(registry.get(LoanId(2)), Err(LendingError::NotFound(LoanId(2)))));
        assert!(registry.get(LoanId(1)).is_ok());
    }

    #[test]
    fn test_created_loan_is_requested_and_indexed() {
        let mut registry = LoanRegistry::new();
        let borrower = Address::new([7u8; 20]);
        let id = registry.create_loan(params(7));

        let loan = registry.get(id).unwrap();
        assert_eq!(loan.state, LoanState::Requested);
        assert_eq!(registry.loans_of_borrower(&borrower), &[id]);
        assert!(registry.loans_of_lender(&borrower).is_empty());
    }

    #[test]
    fn test_update_applies_mutation() {
        let mut registry = LoanRegistry::new();
        let id = registry.create_loan(params(1));

        registry
            .update(id, |loan| loan.state = LoanState::Funded)
            .unwrap();
        assert_eq!(registry.get(id).unwrap().state, LoanState::Funded);

        assert!(registry.update(LoanId(9), |_| {}).is_err());
    }

    #[test]
    fn test_rollback_restores_everything() {
        let mut registry = LoanRegistry::new();
        let lender = Address::new([9u8; 20]);
        let existing = registry.create_loan(params(1));

        registry.begin();
        registry
            .update(existing, |loan| {
                loan.lender = Some(lender);
                loan.state = LoanState::Funded;
            })
            .unwrap();
        registry.index_lender(lender, existing);
        let created = registry.create_loan(params(2));
        assert_eq!(created, LoanId(2));
        registry.rollback();

        assert!(!registry.in_transaction());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.next_id(), LoanId(2));
        let loan = registry.get(existing).unwrap();
        assert_eq!(loan.state, LoanState::Requested);
        assert!(loan.lender.is_none());
        assert!(registry.loans_of_lender(&lender).is_empty());
        assert!(registry.loans_of_borrower(&Address::new([2u8; 20])).is_empty());
    }

    #[test]
    fn test_rollback_of_repeated_updates_restores_oldest() {
        let mut registry = LoanRegistry::new();
        let id = registry.create_loan(params(1));

        registry.begin();
        registry.update(id, |loan| loan.state = LoanState::Funded).unwrap();
        registry.update(id, |loan| loan.state = LoanState::Repaid).unwrap();
        registry.rollback();

        assert_eq!(registry.get(id).unwrap().state, LoanState::Requested);
    }

    #[test]
    fn test_commit_keeps_mutations() {
        let mut registry = LoanRegistry::new();

        registry.begin();
        let id = registry.create_loan(params(1));
        registry.commit();
        registry.rollback(); // no open transaction: no-op

        assert!(registry.get(id).is_ok());
        assert_eq!(registry.next_id(), LoanId(2));
    }
}
