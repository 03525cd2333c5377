//! # Value Objects
//!
//! Immutable domain primitives for the lending ledger.
//! These types represent concepts that are defined by their value, not identity.

use serde::{Deserialize, Serialize};
use std::fmt;

// Re-export U256 from primitive-types for 256-bit value amounts
pub use primitive_types::U256;

// =============================================================================
// ADDRESS (20 bytes)
// =============================================================================

/// A 20-byte account identity (borrower, lender, operator).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address (0x0000...0000).
    pub const ZERO: Self = Self([0u8; 20]);

    /// Creates an address from a 20-byte array.
    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Creates an address from a slice. Returns None if wrong length.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        <[u8; 20]>::try_from(slice).ok().map(Self)
    }

    /// Parses a hex string, with or without a `0x` prefix.
    #[must_use]
    pub fn from_hex(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let bytes = hex::decode(digits).ok()?;
        Self::from_slice(&bytes)
    }

    /// Returns the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Returns true if this is the zero address.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{}...{}",
            hex::encode(&self.0[..4]),
            hex::encode(&self.0[18..])
        )
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl From<Address> for [u8; 20] {
    fn from(addr: Address) -> Self {
        addr.0
    }
}

// =============================================================================
// LOAN ID
// =============================================================================

/// Dense, strictly increasing loan identifier. The first loan is `1`;
/// `0` is never allocated.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct LoanId(pub u64);

impl LoanId {
    /// The first identifier handed out by a fresh registry.
    pub const FIRST: Self = Self(1);

    /// Returns the raw value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LoanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for LoanId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

// =============================================================================
// LOAN STATE
// =============================================================================

/// Loan lifecycle state machine.
///
/// ```text
/// Requested ──fund──→ Funded ──repay──→ Repaid
///                        │
///                        └──claim / liquidate──→ Defaulted
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanState {
    /// Collateral locked, waiting for a lender.
    #[default]
    Requested,
    /// Principal sent to the borrower, repayment outstanding.
    Funded,
    /// Principal plus interest repaid, collateral returned.
    Repaid,
    /// Collateral seized after the due date.
    Defaulted,
}

impl LoanState {
    /// Check if transition is valid.
    #[must_use]
    pub fn can_transition_to(&self, next: LoanState) -> bool {
        matches!(
            (self, next),
            (Self::Requested, Self::Funded)
                | (Self::Funded, Self::Repaid)
                | (Self::Funded, Self::Defaulted)
        )
    }

    /// Check if terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Repaid | Self::Defaulted)
    }

    /// Short lowercase name, used in logs and error messages.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Funded => "funded",
            Self::Repaid => "repaid",
            Self::Defaulted => "defaulted",
        }
    }
}

impl fmt::Display for LoanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// TESTS
// =============================================================================
