//! # Error Types
//!
//! All error types for the lending ledger.
//!
//! Every `LendingError` returned from a mutating operation means the ledger is
//! exactly as it was before the call.

use crate::domain::value_objects::{Address, LoanId, LoanState, U256};
use thiserror::Error;

// =============================================================================
// LENDING ERRORS
// =============================================================================

/// Errors returned by loan lifecycle operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LendingError {
    /// Collateral or principal is zero, or principal exceeds collateral.
    #[error("invalid amount: collateral {collateral}, loan {loan_amount}")]
    InvalidAmount { collateral: U256, loan_amount: U256 },

    /// Interest rate must be strictly positive.
    #[error("invalid interest rate: {0}")]
    InvalidRate(u64),

    /// No loan with this identifier.
    #[error("loan not found: {0}")]
    NotFound(LoanId),

    /// Loan is no longer waiting for a lender.
    #[error("loan {0} already funded")]
    AlreadyFunded(LoanId),

    /// Operation is not valid in the loan's current state.
    #[error("loan {id} is {actual}, expected {expected}")]
    WrongState {
        id: LoanId,
        expected: LoanState,
        actual: LoanState,
    },

    /// Caller is not the loan's borrower.
    #[error("caller {0} is not the borrower")]
    NotBorrower(Address),

    /// Caller is not the loan's lender.
    #[error("caller {0} is not the lender")]
    NotLender(Address),

    /// Caller is not the ledger operator.
    #[error("caller {0} is not the operator")]
    NotOperator(Address),

    /// Attached value does not match the required amount exactly.
    #[error("incorrect value: expected {expected}, supplied {supplied}")]
    IncorrectValue { expected: U256, supplied: U256 },

    /// Collateral cannot be seized until the due date has passed.
    #[error("loan not overdue: now {now}, due {due_date}")]
    NotOverdue { now: u64, due_date: u64 },

    /// A mutating operation is already in flight on this ledger.
    #[error("reentrant call rejected")]
    Reentrant,

    /// Outgoing value transfer failed; the operation was rolled back.
    #[error("value transfer failed: {0}")]
    TransferFailed(#[from] TransferError),

    /// Interest or due-date computation overflowed.
    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    /// A post-mutation invariant check failed; the operation was rolled back.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl LendingError {
    /// Returns true if the caller lacked the required role.
    #[must_use]
    pub fn is_authorization_failure(&self) -> bool {
        matches!(
            self,
            Self::NotBorrower(_) | Self::NotLender(_) | Self::NotOperator(_)
        )
    }

    /// Returns true if resubmitting with different parameters (or later) can succeed.
    ///
    /// State errors on terminal loans and authorization failures are permanent
    /// for a given caller.
    #[must_use]
    pub fn is_retryable_with_correction(&self) -> bool {
        matches!(
            self,
            Self::InvalidAmount { .. }
                | Self::InvalidRate(_)
                | Self::IncorrectValue { .. }
                | Self::NotOverdue { .. }
                | Self::Reentrant
                | Self::TransferFailed(_)
        )
    }
}

// =============================================================================
// TRANSFER ERRORS
// =============================================================================

/// Errors from the value transfer port.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// Recipient refused the incoming value.
    #[error("recipient {0} rejected transfer")]
    Rejected(Address),

    /// Recipient balance would overflow.
    #[error("balance overflow for {0}")]
    Overflow(Address),

    /// Settlement backend unavailable.
    #[error("settlement unavailable: {0}")]
    Unavailable(String),
}

// =============================================================================
// CONFIG ERRORS
// =============================================================================

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Operator is the zero address.
    #[error("operator address is zero; set QC_LENDING_OPERATOR")]
    ZeroOperator,

    /// Operator address could not be parsed.
    #[error("invalid operator address: {0}")]
    InvalidOperator(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lending_error_display() {
        let err = LendingError::NotFound(LoanId(7));
        assert_eq!(err.to_string(), "loan not found: #7");

        let err = LendingError::IncorrectValue {
            expected: U256::from(105),
            supplied: U256::from(100),
        };
        assert_eq!(err.to_string(), "incorrect value: expected 105, supplied 100");

        let err = LendingError::WrongState {
            id: LoanId(3),
            expected: LoanState::Funded,
            actual: LoanState::Repaid,
        };
        assert_eq!(err.to_string(), "loan #3 is repaid, expected funded");
    }

    #[test]
    fn test_authorization_classification() {
        assert!(LendingError::NotBorrower(Address::ZERO).is_authorization_failure());
        assert!(LendingError::NotLender(Address::ZERO).is_authorization_failure());
        assert!(LendingError::NotOperator(Address::ZERO).is_authorization_failure());
        assert!(!LendingError::Reentrant.is_authorization_failure());
    }

    #[test]
    fn test_retryable_classification() {
        assert!(LendingError::NotOverdue { now: 1, due_date: 2 }.is_retryable_with_correction());
        assert!(LendingError::InvalidRate(0).is_retryable_with_correction());
        assert!(!LendingError::AlreadyFunded(LoanId(1)).is_retryable_with_correction());
        assert!(!LendingError::NotFound(LoanId(1)).is_retryable_with_correction());
    }

    #[test]
    fn test_transfer_error_conversion() {
        let err: LendingError = TransferError::Rejected(Address::new([9u8; 20])).into();
        assert!(matches!(err, LendingError::TransferFailed(_)));
        assert!(err.to_string().contains("rejected"));
    }
}
