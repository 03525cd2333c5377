//! # Domain Module
//!
//! Core domain types and pure logic for the lending ledger.

pub mod access;
pub mod entities;
pub mod interest;
pub mod invariants;
pub mod registry;
pub mod value_objects;

pub use entities::*;
pub use interest::{compute_due_date, compute_interest, SECONDS_PER_YEAR};
pub use invariants::{audit_ledger, check_all_invariants, InvariantCheckResult, InvariantViolation};
pub use registry::LoanRegistry;
pub use value_objects::*;
