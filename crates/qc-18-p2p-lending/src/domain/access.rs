//! # Access Control
//!
//! Stateless predicates checked before any mutation. Each returns the matching
//! `LendingError` on failure and has no side effects, so they compose with `?`.

use super::entities::Loan;
use super::registry::LoanRegistry;
use super::value_objects::{Address, LoanId};
use crate::errors::LendingError;

/// Caller must be the ledger operator.
pub fn is_operator(operator: &Address, caller: &Address) -> Result<(), LendingError> {
    if caller == operator {
        Ok(())
    } else {
        Err(LendingError::NotOperator(*caller))
    }
}

/// Caller must be the loan's borrower.
pub fn is_borrower_of(loan: &Loan, caller: &Address) -> Result<(), LendingError> {
    if loan.borrower == *caller {
        Ok(())
    } else {
        Err(LendingError::NotBorrower(*caller))
    }
}

/// Caller must be the loan's lender. An unfunded loan has no lender, so nobody passes.
pub fn is_lender_of(loan: &Loan, caller: &Address) -> Result<(), LendingError> {
    match loan.lender {
        Some(lender) if lender == *caller => Ok(()),
        _ => Err(LendingError::NotLender(*caller)),
    }
}

/// The loan must exist. Yields it so later checks run against the same record.
pub fn exists(registry: &LoanRegistry, id: LoanId) -> Result<&Loan, LendingError> {
    registry.get(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::LoanParams;
    use crate::domain::value_objects::U256;

    const BORROWER: Address = Address::new([1u8; 20]);
    const LENDER: Address = Address::new([2u8; 20]);
    const STRANGER: Address = Address::new([3u8; 20]);

    fn loan() -> Loan {
        Loan::new(
            LoanId(1),
            LoanParams {
                borrower: BORROWER,
                collateral_amount: U256::from(10),
                loan_amount: U256::from(5),
                interest_rate: 1,
                interest: U256::zero(),
                due_date: 0,
            },
        )
    }

    #[test]
    fn test_operator_check() {
        assert!(is_operator(&LENDER, &LENDER).is_ok());
        assert_eq!(
            is_operator(&LENDER, &STRANGER),
            Err(LendingError::NotOperator(STRANGER))
        );
    }

    #[test]
    fn test_borrower_check() {
        let loan = loan();
        assert!(is_borrower_of(&loan, &BORROWER).is_ok());
        assert_eq!(
            is_borrower_of(&loan, &LENDER),
            Err(LendingError::NotBorrower(LENDER))
        );
    }

    #[test]
    fn test_lender_check_requires_funding() {
        let mut loan = loan();
        // Nobody is the lender of an unfunded loan, not even the zero address.
        assert!(is_lender_of(&loan, &LENDER).is_err());
        assert!(is_lender_of(&loan, &Address::ZERO).is_err());

        loan.lender = Some(LENDER);
        assert!(is_lender_of(&loan, &LENDER).is_ok());
        assert_eq!(
            is_lender_of(&loan, &BORROWER),
            Err(LendingError::NotLender(BORROWER))
        );
    }

    #[test]
    fn test_exists() {
        let mut registry = LoanRegistry::new();
        assert_eq!(exists(&registry, LoanId(1)), Err(LendingError::NotFound(LoanId(1))));

        registry.create_loan(LoanParams {
            borrower: BORROWER,
            collateral_amount: U256::from(10),
            loan_amount: U256::from(5),
            interest_rate: 1,
            interest: U256::zero(),
            due_date: 0,
        });
        assert_eq!(exists(&registry, LoanId(1)).map(|loan| loan.borrower), Ok(BORROWER));
        assert!(exists(&registry, LoanId(0)).is_err());
    }
}
