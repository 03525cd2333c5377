//! # Domain Invariants
//!
//! Ledger invariants checked after every mutation, before the value transfer.
//! A violation aborts the operation and rolls it back.

use super::entities::Loan;
use super::registry::LoanRegistry;
use super::value_objects::{LoanId, LoanState, U256};
use std::fmt;

// =============================================================================
// INVARIANT CHECKS
// =============================================================================

/// Principal never exceeds collateral.
#[must_use]
pub fn check_collateral_covers_principal(loan: &Loan) -> bool {
    loan.loan_amount <= loan.collateral_amount
}

/// `lender` is empty iff the loan is still `Requested`.
#[must_use]
pub fn check_lender_matches_state(loan: &Loan) -> bool {
    loan.lender.is_none() == (loan.state == LoanState::Requested)
}

/// A transition is monotonic: same state, or one legal step forward.
#[must_use]
pub fn check_transition(before: LoanState, after: LoanState) -> bool {
    before == after || before.can_transition_to(after)
}

/// Terms fixed at request time are unchanged.
#[must_use]
pub fn check_terms_frozen(before: &Loan, after: &Loan) -> bool {
    before.id == after.id
        && before.borrower == after.borrower
        && before.collateral_amount == after.collateral_amount
        && before.loan_amount == after.loan_amount
        && before.interest_rate == after.interest_rate
        && before.interest == after.interest
        && before.due_date == after.due_date
}

/// Escrow after an operation equals escrow before, adjusted by the collateral
/// the touched loan started or stopped holding.
#[must_use]
pub fn expected_escrow(before: Option<&Loan>, after: &Loan, escrow_before: U256) -> Option<U256> {
    let held_before = before.is_some_and(Loan::holds_collateral);
    match (held_before, after.holds_collateral()) {
        (false, true) => escrow_before.checked_add(after.collateral_amount),
        (true, false) => escrow_before.checked_sub(after.collateral_amount),
        _ => Some(escrow_before),
    }
}

/// Sum of collateral still held for non-terminal loans (`None` on overflow).
#[must_use]
pub fn open_collateral(registry: &LoanRegistry) -> Option<U256> {
    registry
        .iter()
        .filter(|loan| loan.holds_collateral())
        .try_fold(U256::zero(), |acc, loan| acc.checked_add(loan.collateral_amount))
}

/// Check a single loan, optionally against its previous version.
#[must_use]
pub fn check_loan(before: Option<&Loan>, after: &Loan) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    if !check_collateral_covers_principal(after) {
        violations.push(InvariantViolation::PrincipalExceedsCollateral(after.id));
    }
    if !check_lender_matches_state(after) {
        violations.push(InvariantViolation::LenderStateMismatch {
            id: after.id,
            state: after.state,
        });
    }
    if let Some(before) = before {
        if !check_transition(before.state, after.state) {
            violations.push(InvariantViolation::IllegalTransition {
                id: after.id,
                from: before.state,
                to: after.state,
            });
        }
        if !check_terms_frozen(before, after) {
            violations.push(InvariantViolation::TermsChanged(after.id));
        }
    }

    violations
}

/// Check one operation: the touched loan and the escrow movement it caused.
#[must_use]
pub fn check_all_invariants(
    before: Option<&Loan>,
    after: &Loan,
    escrow_before: U256,
    escrow_after: U256,
) -> InvariantCheckResult {
    let mut violations = check_loan(before, after);

    let expected = expected_escrow(before, after, escrow_before);
    if expected != Some(escrow_after) {
        violations.push(InvariantViolation::EscrowMismatch {
            escrow: escrow_after,
            expected,
        });
    }

    InvariantCheckResult::from_violations(violations)
}

/// Full scan of the ledger: every loan, and escrow against open collateral.
#[must_use]
pub fn audit_ledger(registry: &LoanRegistry, escrow: U256) -> InvariantCheckResult {
    let mut violations: Vec<InvariantViolation> = registry
        .iter()
        .flat_map(|loan| check_loan(None, loan))
        .collect();

    let expected = open_collateral(registry);
    if expected != Some(escrow) {
        violations.push(InvariantViolation::EscrowMismatch { escrow, expected });
    }

    InvariantCheckResult::from_violations(violations)
}

// =============================================================================
// INVARIANT TYPES
// =============================================================================

/// Result of checking all invariants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantCheckResult {
    /// All invariants hold.
    Valid,
    /// One or more invariants violated.
    Invalid(Vec<InvariantViolation>),
}

impl InvariantCheckResult {
    /// Returns true if all invariants hold.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    fn from_violations(violations: Vec<InvariantViolation>) -> Self {
        if violations.is_empty() {
            Self::Valid
        } else {
            Self::Invalid(violations)
        }
    }

    /// Joins violations into one message (empty when valid).
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Valid => String::new(),
            Self::Invalid(violations) => violations
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}

/// Specific invariant violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantViolation {
    /// `loan_amount > collateral_amount`.
    PrincipalExceedsCollateral(LoanId),
    /// Lender set while requested, or missing after funding.
    LenderStateMismatch { id: LoanId, state: LoanState },
    /// State moved backwards or skipped a step.
    IllegalTransition {
        id: LoanId,
        from: LoanState,
        to: LoanState,
    },
    /// Request-time terms were modified.
    TermsChanged(LoanId),
    /// Escrow disagrees with the collateral of open loans.
    EscrowMismatch {
        escrow: U256,
        expected: Option<U256>,
    },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrincipalExceedsCollateral(id) => {
                write!(f, "loan {id}: principal exceeds collateral")
            }
            Self::LenderStateMismatch { id, state } => {
                write!(f, "loan {id}: lender presence inconsistent with state {state}")
            }
            Self::IllegalTransition { id, from, to } => {
                write!(f, "loan {id}: illegal transition {from} -> {to}")
            }
            Self::TermsChanged(id) => write!(f, "loan {id}: request-time terms modified"),
            Self::EscrowMismatch { escrow, expected } => match expected {
                Some(expected) => write!(f, "escrow {escrow} != open collateral {expected}"),
                None => write!(f, "escrow {escrow}, open collateral overflows"),
            },
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
