//! # Lending Service
//!
//! The loan lifecycle state machine. Implements [`LendingApi`] over the
//! registry, the value transfer guard and the outbound ports.
//!
//! ## Execution order
//!
//! Every mutating operation runs as one atomic unit:
//!
//! 1. Enter the guard (`Reentrant` if an operation is already in flight).
//! 2. Read the clock once.
//! 3. Open the registry journal, run all precondition checks, then mutate
//!    the registry and escrow, then check invariants.
//! 4. Settle the outgoing transfers as one batch.
//! 5. Commit and publish events, or roll back the journal and escrow. A panic
//!    out of settlement rolls back the same way.
//!
//! The state mutex is not held during settlement, so recipient code may read
//! the ledger. Any nested mutating call is stopped by the guard.

use crate::config::LendingConfig;
use crate::domain::access;
use crate::domain::interest::{compute_due_date, compute_interest};
use crate::domain::invariants::{audit_ledger, check_all_invariants, InvariantCheckResult};
use crate::domain::{Address, Loan, LoanId, LoanParams, LoanRegistry, LoanState, U256};
use crate::errors::{ConfigError, LendingError};
use crate::events::LoanEvent;
use crate::guard::ValueTransferGuard;
use crate::ports::inbound::{LedgerStats, LendingApi};
use crate::ports::outbound::{Clock, EventSink, Transfer, ValueTransfer};

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

// =============================================================================
// LEDGER STATE
// =============================================================================

/// Everything a rollback must restore.
#[derive(Debug, Default)]
struct LedgerState {
    registry: LoanRegistry,
    /// Value held in custody.
    escrow: U256,
}

/// Staged effects of one operation, applied to the ledger under the journal.
struct Transaction<'a> {
    state: &'a mut LedgerState,
    now: u64,
    escrow_before: U256,
    /// Loan touched by this operation and its value before the operation.
    touched: Option<(LoanId, Option<Loan>)>,
    transfers: Vec<Transfer>,
    events: Vec<LoanEvent>,
}

/// What survives a successful in-memory phase.
struct Effects {
    transfers: Vec<Transfer>,
    events: Vec<LoanEvent>,
}

impl<'a> Transaction<'a> {
    fn new(state: &'a mut LedgerState, now: u64) -> Self {
        let escrow_before = state.escrow;
        Self {
            state,
            now,
            escrow_before,
            touched: None,
            transfers: Vec::new(),
            events: Vec::new(),
        }
    }

    fn loan(&self, id: LoanId) -> Result<Loan, LendingError> {
        access::exists(&self.state.registry, id).cloned()
    }

    fn create_loan(&mut self, params: LoanParams) -> LoanId {
        let id = self.state.registry.create_loan(params);
        self.touched = Some((id, None));
        id
    }

    fn transition<F>(&mut self, id: LoanId, mutator: F) -> Result<(), LendingError>
    where
        F: FnOnce(&mut Loan),
    {
        let before = self.loan(id)?;
        self.state.registry.update(id, mutator)?;
        self.touched = Some((id, Some(before)));
        Ok(())
    }

    fn index_lender(&mut self, lender: Address, id: LoanId) {
        self.state.registry.index_lender(lender, id);
    }

    /// Take the value attached to the call into custody.
    fn lock_value(&mut self, amount: U256) -> Result<(), LendingError> {
        self.state.escrow = self
            .state
            .escrow
            .checked_add(amount)
            .ok_or(LendingError::ArithmeticOverflow)?;
        Ok(())
    }

    /// Release custody value to `to`. The transfer runs after the mutation.
    fn release(&mut self, to: Address, amount: U256) -> Result<(), LendingError> {
        self.state.escrow = self.state.escrow.checked_sub(amount).ok_or_else(|| {
            LendingError::InvariantViolation(format!(
                "escrow {} cannot cover release of {amount}",
                self.state.escrow
            ))
        })?;
        self.transfers.push(Transfer::new(to, amount));
        Ok(())
    }

    fn emit(&mut self, event: LoanEvent) {
        self.events.push(event);
    }

    fn verify(&self) -> Result<(), LendingError> {
        let Some((id, before)) = &self.touched else {
            return Ok(());
        };
        let after = self.state.registry.get(*id)?;
        match check_all_invariants(before.as_ref(), after, self.escrow_before, self.state.escrow) {
            InvariantCheckResult::Valid => Ok(()),
            invalid => Err(LendingError::InvariantViolation(invalid.describe())),
        }
    }

    fn into_effects(self) -> Effects {
        Effects {
            transfers: self.transfers,
            events: self.events,
        }
    }
}

/// Mutations awaiting settlement. Rolled back when dropped, including on
/// unwind out of `ValueTransfer::settle`, unless committed.
struct PendingSettlement<'a> {
    state: &'a Mutex<LedgerState>,
    escrow_before: U256,
    committed: bool,
}

impl PendingSettlement<'_> {
    fn commit(mut self) {
        self.state.lock().registry.commit();
        self.committed = true;
    }
}

impl Drop for PendingSettlement<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        let mut state = self.state.lock();
        state.registry.rollback();
        state.escrow = self.escrow_before;
        if std::thread::panicking() {
            error!("[qc-18] Operation rolled back: value transfer panicked");
        }
    }
}

// =============================================================================
// SERVICE
// =============================================================================

/// Peer-to-peer collateralized lending ledger.
pub struct LendingService {
    config: LendingConfig,
    guard: ValueTransferGuard,
    state: Mutex<LedgerState>,
    clock: Arc<dyn Clock>,
    transfers: Arc<dyn ValueTransfer>,
    events: Arc<dyn EventSink>,
}

impl LendingService {
    /// Create an empty ledger.
    ///
    /// # Errors
    ///
    /// Fails if `config` does not validate.
    pub fn new(
        config: LendingConfig,
        clock: Arc<dyn Clock>,
        transfers: Arc<dyn ValueTransfer>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        info!(
            service = %config.service_name,
            operator = %config.operator,
            "[qc-18] Lending service created"
        );
        Ok(Self {
            config,
            guard: ValueTransferGuard::new(),
            state: Mutex::new(LedgerState::default()),
            clock,
            transfers,
            events,
        })
    }

    /// Service configuration.
    #[must_use]
    pub fn config(&self) -> &LendingConfig {
        &self.config
    }

    /// Full consistency scan over every loan and the escrow balance.
    #[must_use]
    pub fn audit(&self) -> InvariantCheckResult {
        let state = self.state.lock();
        audit_ledger(&state.registry, state.escrow)
    }

    /// Run `op` as one atomic, non-reentrant operation.
    fn execute<T, F>(
        &self,
        operation: &'static str,
        caller: Address,
        loan_id: Option<LoanId>,
        op: F,
    ) -> Result<T, LendingError>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, LendingError>,
    {
        let span = info_span!(
            "lending_op",
            op = operation,
            op_id = %Uuid::new_v4(),
            caller = %caller,
            loan_id = loan_id.map(LoanId::get)
        );
        let _entered = span.enter();

        let _section = self.guard.enter().map_err(|err| {
            warn!("[qc-18] {} rejected: operation already in flight", operation);
            err
        })?;
        let now = self.clock.now();

        let (value, effects, escrow_before) = {
            let mut state = self.state.lock();
            let escrow_before = state.escrow;
            state.registry.begin();

            let mut tx = Transaction::new(&mut state, now);
            match op(&mut tx).and_then(|value| tx.verify().map(|()| value)) {
                Ok(value) => (value, tx.into_effects(), escrow_before),
                Err(err) => {
                    drop(tx);
                    state.registry.rollback();
                    state.escrow = escrow_before;
                    Self::log_rejection(operation, &err);
                    return Err(err);
                }
            }
        };

        let pending = PendingSettlement {
            state: &self.state,
            escrow_before,
            committed: false,
        };
        if let Err(err) = self.transfers.settle(&effects.transfers) {
            drop(pending);
            error!(
                error = %err,
                transfers = effects.transfers.len(),
                "[qc-18] {} rolled back: value transfer failed",
                operation
            );
            return Err(err.into());
        }

        pending.commit();
        for event in &effects.events {
            self.events.publish(event);
        }
        info!("[qc-18] {} committed", operation);
        Ok(value)
    }

    fn log_rejection(operation: &str, err: &LendingError) {
        if err.is_authorization_failure() {
            warn!(error = %err, "[qc-18] {} unauthorized", operation);
        } else if matches!(err, LendingError::InvariantViolation(_)) {
            error!(error = %err, "[qc-18] {} aborted", operation);
        } else {
            debug!(error = %err, "[qc-18] {} rejected", operation);
        }
    }

    /// Shared effects of lender claim and operator liquidation.
    fn seize(tx: &mut Transaction<'_>, loan: &Loan) -> Result<(), LendingError> {
        if !loan.is_overdue(tx.now) {
            return Err(LendingError::NotOverdue {
                now: tx.now,
                due_date: loan.due_date,
            });
        }
        expect_state(loan, LoanState::Funded)?;
        let lender = funded_lender(loan)?;

        tx.transition(loan.id, |l| l.state = LoanState::Defaulted)?;
        tx.release(lender, loan.collateral_amount)?;
        tx.emit(LoanEvent::CollateralClaimed { loan_id: loan.id });
        Ok(())
    }
}

fn expect_state(loan: &Loan, expected: LoanState) -> Result<(), LendingError> {
    if loan.state == expected {
        Ok(())
    } else {
        Err(LendingError::WrongState {
            id: loan.id,
            expected,
            actual: loan.state,
        })
    }
}

fn funded_lender(loan: &Loan) -> Result<Address, LendingError> {
    loan.lender.ok_or_else(|| {
        LendingError::InvariantViolation(format!("loan {} is funded without a lender", loan.id))
    })
}

// =============================================================================
// INBOUND PORT
// =============================================================================

impl LendingApi for LendingService {
    fn request_loan(
        &self,
        caller: Address,
        collateral_value: U256,
        loan_amount: U256,
        interest_rate: u64,
        duration_secs: u64,
    ) -> Result<LoanId, LendingError> {
        self.execute("request_loan", caller, None, |tx| {
            if collateral_value.is_zero() || loan_amount.is_zero() || loan_amount > collateral_value
            {
                return Err(LendingError::InvalidAmount {
                    collateral: collateral_value,
                    loan_amount,
                });
            }
            if interest_rate == 0 {
                return Err(LendingError::InvalidRate(interest_rate));
            }

            let interest = compute_interest(loan_amount, interest_rate, duration_secs)
                .ok_or(LendingError::ArithmeticOverflow)?;
            loan_amount
                .checked_add(interest)
                .ok_or(LendingError::ArithmeticOverflow)?;
            let due_date =
                compute_due_date(tx.now, duration_secs).ok_or(LendingError::ArithmeticOverflow)?;

            tx.lock_value(collateral_value)?;
            let loan_id = tx.create_loan(LoanParams {
                borrower: caller,
                collateral_amount: collateral_value,
                loan_amount,
                interest_rate,
                interest,
                due_date,
            });
            tx.emit(LoanEvent::LoanRequested {
                loan_id,
                borrower: caller,
                collateral: collateral_value,
                loan_amount,
                rate: interest_rate,
                interest,
                due_date,
            });
            Ok(loan_id)
        })
    }

    fn fund_loan(&self, caller: Address, loan_id: LoanId, supplied: U256) -> Result<(), LendingError> {
        self.execute("fund_loan", caller, Some(loan_id), |tx| {
            let loan = tx.loan(loan_id)?;
            if loan.state != LoanState::Requested {
                return Err(LendingError::AlreadyFunded(loan_id));
            }
            if supplied != loan.loan_amount {
                return Err(LendingError::IncorrectValue {
                    expected: loan.loan_amount,
                    supplied,
                });
            }

            tx.lock_value(supplied)?;
            tx.transition(loan_id, |l| {
                l.lender = Some(caller);
                l.state = LoanState::Funded;
            })?;
            tx.index_lender(caller, loan_id);
            tx.release(loan.borrower, loan.loan_amount)?;
            tx.emit(LoanEvent::LoanFunded {
                loan_id,
                lender: caller,
            });
            Ok(())
        })
    }

    fn repay_loan(&self, caller: Address, loan_id: LoanId, supplied: U256) -> Result<(), LendingError> {
        self.execute("repay_loan", caller, Some(loan_id), |tx| {
            let loan = tx.loan(loan_id)?;
            access::is_borrower_of(&loan, &caller)?;
            expect_state(&loan, LoanState::Funded)?;
            let total_due = loan.total_due();
            if supplied != total_due {
                return Err(LendingError::IncorrectValue {
                    expected: total_due,
                    supplied,
                });
            }
            let lender = funded_lender(&loan)?;

            tx.lock_value(supplied)?;
            tx.transition(loan_id, |l| l.state = LoanState::Repaid)?;
            tx.release(lender, total_due)?;
            tx.release(loan.borrower, loan.collateral_amount)?;
            tx.emit(LoanEvent::LoanRepaid { loan_id });
            Ok(())
        })
    }

    fn claim_collateral(&self, caller: Address, loan_id: LoanId) -> Result<(), LendingError> {
        self.execute("claim_collateral", caller, Some(loan_id), |tx| {
            let loan = tx.loan(loan_id)?;
            access::is_lender_of(&loan, &caller)?;
            Self::seize(tx, &loan)
        })
    }

    fn auto_liquidate(&self, caller: Address, loan_id: LoanId) -> Result<(), LendingError> {
        let operator = self.config.operator;
        self.execute("auto_liquidate", caller, Some(loan_id), |tx| {
            let loan = tx.loan(loan_id)?;
            access::is_operator(&operator, &caller)?;
            Self::seize(tx, &loan)
        })
    }

    fn get_loan_details(&self, loan_id: LoanId) -> Result<Loan, LendingError> {
        self.state.lock().registry.get(loan_id).cloned()
    }

    fn loans_by_borrower(&self, borrower: Address) -> Vec<LoanId> {
        self.state.lock().registry.loans_of_borrower(&borrower).to_vec()
    }

    fn loans_by_lender(&self, lender: Address) -> Vec<LoanId> {
        self.state.lock().registry.loans_of_lender(&lender).to_vec()
    }

    fn loan_count(&self) -> u64 {
        self.state.lock().registry.len() as u64
    }

    fn is_overdue(&self, loan_id: LoanId) -> Result<bool, LendingError> {
        let now = self.clock.now();
        let state = self.state.lock();
        let loan = state.registry.get(loan_id)?;
        Ok(loan.is_overdue(now))
    }

    fn escrow_balance(&self) -> U256 {
        self.state.lock().escrow
    }

    fn ledger_stats(&self) -> LedgerStats {
        let state = self.state.lock();
        let mut stats = LedgerStats {
            escrow: state.escrow,
            ..LedgerStats::default()
        };
        for loan in state.registry.iter() {
            match loan.state {
                LoanState::Requested => stats.requested += 1,
                LoanState::Funded => stats.funded += 1,
                LoanState::Repaid => stats.repaid += 1,
                LoanState::Defaulted => stats.defaulted += 1,
            }
        }
        stats
    }

    fn operator(&self) -> Address {
        self.config.operator
    }
}

impl std::fmt::Debug for LendingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LendingService")
            .field("config", &self.config)
            .field("in_flight", &self.guard.is_locked())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// TESTS
// =============================================================================
