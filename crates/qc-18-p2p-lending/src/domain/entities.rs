//! # Domain Entities
//!
//! The `Loan` record owned by the registry.

use super::value_objects::{Address, LoanId, LoanState, U256};
use serde::{Deserialize, Serialize};

/// A peer-to-peer collateralized loan.
///
/// `interest` and `due_date` are fixed when the loan is requested and never
/// recomputed. `lender` is `None` exactly while the loan is `Requested`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    /// Registry identifier.
    pub id: LoanId,
    /// Account that locked the collateral.
    pub borrower: Address,
    /// Account that funded the loan.
    pub lender: Option<Address>,
    /// Value locked by the borrower.
    pub collateral_amount: U256,
    /// Principal.
    pub loan_amount: U256,
    /// Annual rate in percentage points.
    pub interest_rate: u64,
    /// Interest owed on top of the principal.
    pub interest: U256,
    /// Unix timestamp after which the collateral may be seized.
    pub due_date: u64,
    /// Lifecycle state.
    pub state: LoanState,
}

/// Fields for a new loan, as validated by the lifecycle state machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoanParams {
    /// Requesting account.
    pub borrower: Address,
    /// Value locked.
    pub collateral_amount: U256,
    /// Principal.
    pub loan_amount: U256,
    /// Annual rate in percentage points.
    pub interest_rate: u64,
    /// Pre-computed interest.
    pub interest: U256,
    /// Absolute due date.
    pub due_date: u64,
}

impl Loan {
    /// Create a loan in `Requested` state.
    #[must_use]
    pub fn new(id: LoanId, params: LoanParams) -> Self {
        Self {
            id,
            borrower: params.borrower,
            lender: None,
            collateral_amount: params.collateral_amount,
            loan_amount: params.loan_amount,
            interest_rate: params.interest_rate,
            interest: params.interest,
            due_date: params.due_date,
            state: LoanState::Requested,
        }
    }

    /// Principal plus interest: the exact value `repay` must carry.
    ///
    /// Saturates rather than wrapping; request-time validation bounds both terms.
    #[must_use]
    pub fn total_due(&self) -> U256 {
        self.loan_amount.saturating_add(self.interest)
    }

    /// True once `now` is strictly past the due date.
    #[must_use]
    pub fn is_overdue(&self, now: u64) -> bool {
        now > self.due_date
    }

    /// True while the collateral is held by the ledger.
    #[must_use]
    pub fn holds_collateral(&self) -> bool {
        !self.state.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_params() -> LoanParams {
        LoanParams {
            borrower: Address::new([1u8; 20]),
            collateral_amount: U256::from(2000),
            loan_amount: U256::from(1000),
            interest_rate: 5,
            interest: U256::from(4),
            due_date: 10_000,
        }
    }

    #[test]
    fn test_new_loan_is_requested() {
        let loan = Loan::new(LoanId(1), sample_params());
        assert_eq!(loan.state, LoanState::Requested);
        assert!(loan.lender.is_none());
        assert!(loan.holds_collateral());
    }

    #[test]
    fn test_total_due() {
        let loan = Loan::new(LoanId(1), sample_params());
        assert_eq!(loan.total_due(), U256::from(1004));
    }

    #[test]
    fn test_is_overdue_is_strict() {
        let loan = Loan::new(LoanId(1), sample_params());
        assert!(!loan.is_overdue(9_999));
        assert!(!loan.is_overdue(10_000));
        assert!(loan.is_overdue(10_001));
    }

    #[test]
    fn test_terminal_loan_releases_collateral() {
        let mut loan = Loan::new(LoanId(1), sample_params());
        loan.state = LoanState::Repaid;
        assert!(!loan.holds_collateral());
    }
}
