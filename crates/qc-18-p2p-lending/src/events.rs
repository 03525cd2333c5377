//! # Event Schema
//!
//! Notifications published after an operation commits. A failed or rolled-back
//! operation publishes nothing.

use crate::domain::value_objects::{Address, LoanId, U256};
use serde::{Deserialize, Serialize};

// =============================================================================
// LOAN EVENTS
// =============================================================================

/// Lifecycle notifications, one per successful mutating operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoanEvent {
    /// Collateral locked and loan opened.
    LoanRequested {
        /// New loan.
        loan_id: LoanId,
        /// Requesting account.
        borrower: Address,
        /// Collateral locked.
        collateral: U256,
        /// Principal requested.
        loan_amount: U256,
        /// Annual rate, percentage points.
        rate: u64,
        /// Interest fixed at request time.
        interest: U256,
        /// Absolute due date.
        due_date: u64,
    },
    /// Principal delivered to the borrower.
    LoanFunded {
        /// Funded loan.
        loan_id: LoanId,
        /// Funding account.
        lender: Address,
    },
    /// Principal plus interest paid, collateral returned.
    LoanRepaid {
        /// Repaid loan.
        loan_id: LoanId,
    },
    /// Collateral seized by the lender or operator.
    CollateralClaimed {
        /// Defaulted loan.
        loan_id: LoanId,
    },
}

impl LoanEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> LoanTopic {
        match self {
            Self::LoanRequested { .. } => LoanTopic::Requested,
            Self::LoanFunded { .. } => LoanTopic::Funded,
            Self::LoanRepaid { .. } => LoanTopic::Repaid,
            Self::CollateralClaimed { .. } => LoanTopic::CollateralClaimed,
        }
    }

    /// Loan this event refers to.
    #[must_use]
    pub fn loan_id(&self) -> LoanId {
        match self {
            Self::LoanRequested { loan_id, .. }
            | Self::LoanFunded { loan_id, .. }
            | Self::LoanRepaid { loan_id }
            | Self::CollateralClaimed { loan_id } => *loan_id,
        }
    }
}

// =============================================================================
// TOPICS
// =============================================================================

/// Event topics for subscription filtering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanTopic {
    /// `LoanRequested`.
    Requested,
    /// `LoanFunded`.
    Funded,
    /// `LoanRepaid`.
    Repaid,
    /// `CollateralClaimed`.
    CollateralClaimed,
}

impl LoanTopic {
    /// Stable topic name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Requested => "lending.loan_requested",
            Self::Funded => "lending.loan_funded",
            Self::Repaid => "lending.loan_repaid",
            Self::CollateralClaimed => "lending.collateral_claimed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_topic_mapping() {
        let event = LoanEvent::LoanRepaid { loan_id: LoanId(4) };
        assert_eq!(event.topic(), LoanTopic::Repaid);
        assert_eq!(event.topic().as_str(), "lending.loan_repaid");
        assert_eq!(event.loan_id(), LoanId(4));
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = LoanEvent::LoanFunded {
            loan_id: LoanId(1),
            lender: Address::new([2u8; 20]),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "loan_funded");
        assert_eq!(json["loan_id"], 1);

        let back: LoanEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
