//! # Inbound Ports
//!
//! API trait defining what the lending ledger can do.

use crate::domain::{Address, Loan, LoanId, U256};
use crate::errors::LendingError;
use serde::{Deserialize, Serialize};

/// Lending API - inbound port.
///
/// Every mutating operation is atomic: on `Err` the ledger is unchanged and
/// nothing was transferred or published. `caller` is the authenticated
/// account; `supplied` is the value attached to the call.
pub trait LendingApi: Send + Sync {
    /// Lock `collateral_value` and open a loan request.
    fn request_loan(
        &self,
        caller: Address,
        collateral_value: U256,
        loan_amount: U256,
        interest_rate: u64,
        duration_secs: u64,
    ) -> Result<LoanId, LendingError>;

    /// Fund a requested loan; `supplied` must equal the principal.
    fn fund_loan(&self, caller: Address, loan_id: LoanId, supplied: U256)
        -> Result<(), LendingError>;

    /// Repay a funded loan; `supplied` must equal principal plus interest.
    fn repay_loan(&self, caller: Address, loan_id: LoanId, supplied: U256)
        -> Result<(), LendingError>;

    /// Lender seizes the collateral of an overdue loan.
    fn claim_collateral(&self, caller: Address, loan_id: LoanId) -> Result<(), LendingError>;

    /// Operator seizes the collateral on the lender's behalf.
    fn auto_liquidate(&self, caller: Address, loan_id: LoanId) -> Result<(), LendingError>;

    /// Snapshot of a loan.
    fn get_loan_details(&self, loan_id: LoanId) -> Result<Loan, LendingError>;

    /// Loans requested by `borrower`, oldest first.
    fn loans_by_borrower(&self, borrower: Address) -> Vec<LoanId>;

    /// Loans funded by `lender`, oldest first.
    fn loans_by_lender(&self, lender: Address) -> Vec<LoanId>;

    /// Number of loans ever created.
    fn loan_count(&self) -> u64;

    /// True if the loan exists and its due date has passed.
    fn is_overdue(&self, loan_id: LoanId) -> Result<bool, LendingError>;

    /// Value currently held in custody.
    fn escrow_balance(&self) -> U256;

    /// Aggregate counters.
    fn ledger_stats(&self) -> LedgerStats;

    /// Account allowed to call `auto_liquidate`.
    fn operator(&self) -> Address;
}

/// Aggregate view of the ledger.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStats {
    /// Loans awaiting a lender.
    pub requested: u64,
    /// Loans with repayment outstanding.
    pub funded: u64,
    /// Loans closed by repayment.
    pub repaid: u64,
    /// Loans closed by seizure.
    pub defaulted: u64,
    /// Value held in custody.
    pub escrow: U256,
}

impl LedgerStats {
    /// Total loans ever created.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.requested + self.funded + self.repaid + self.defaulted
    }
}
