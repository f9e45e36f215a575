// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The withdrawal approval engine.
//!
//! Every mutating operation runs the same gate, in order:
//!
//! 1. capability check for the actor's role
//! 2. input validation
//! 3. rate limit for (actor, action)
//! 4. per-request in-flight guard
//! 5. load request and linked transaction
//! 6. state-machine check
//! 7. destination check (`process` only)
//! 8. locked-balance re-check
//! 9. mutation
//!
//! Mutations that touch both the withdrawal store and the ledger run as a
//! [`Saga`] whose first step is a check-and-set on the request status. That
//! check-and-set is what makes two concurrent callers unable to both settle
//! the same request.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashSet;
use serde_json::json;
use tracing::{error, info, warn};

use super::error::{WorkflowError, WorkflowResult};
use super::rate_limit::{RateLimitConfig, RateLimiter};
use super::saga::{Saga, SagaFailure};
use crate::auth::roles::{Action, Role};
use crate::config::DEFAULT_PAYOUT_TIMEOUT_SECS;
use crate::ledger::{BalanceRecord, Ledger, LedgerError, UnlockMode};
use crate::notifications::{LogNotifier, Notifier, UserNotification};
use crate::providers::{
    DisabledPayoutProvider, PayoutError, PayoutInstruction, PayoutProvider, PayoutReceipt,
};
use crate::storage::audit::{AuditEvent, AuditEventType, AuditQuery, AuditSink};
use crate::withdrawal::{
    rejection_note, Destination, ProcessingType, StoreError, Transaction, TransactionStatus,
    WithdrawalRequest, WithdrawalStatus, WithdrawalStore,
};

const RESOURCE_TYPE: &str = "withdrawal_request";

/// Identity and role of whoever invokes the engine. Trusted as verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }
}

/// Result of a completed withdrawal.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub request: WithdrawalRequest,
    pub transaction: Transaction,
    /// Recipient deposit, for internal transfers.
    pub deposit: Option<Transaction>,
}

#[derive(Debug, thiserror::Error)]
enum StepError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Marks a request as being worked on. Released on drop.
struct InFlight<'a> {
    set: &'a DashSet<String>,
    request_id: String,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set.remove(&self.request_id);
    }
}

pub struct WithdrawalEngine {
    ledger: Arc<dyn Ledger>,
    store: Arc<dyn WithdrawalStore>,
    audit: Arc<dyn AuditSink>,
    payouts: Arc<dyn PayoutProvider>,
    notifier: Arc<dyn Notifier>,
    rate_limiter: RateLimiter,
    payout_timeout: Duration,
    in_flight: DashSet<String>,
}

impl WithdrawalEngine {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        store: Arc<dyn WithdrawalStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            ledger,
            store,
            audit,
            payouts: Arc::new(DisabledPayoutProvider),
            notifier: Arc::new(LogNotifier),
            rate_limiter: RateLimiter::default(),
            payout_timeout: Duration::from_secs(DEFAULT_PAYOUT_TIMEOUT_SECS),
            in_flight: DashSet::new(),
        }
    }

    pub fn with_payout_provider(mut self, payouts: Arc<dyn PayoutProvider>) -> Self {
        self.payouts = payouts;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limiter = RateLimiter::new(config);
        self
    }

    pub fn with_payout_timeout(mut self, timeout: Duration) -> Self {
        self.payout_timeout = timeout;
        self
    }

    pub fn payout_provider_name(&self) -> &'static str {
        self.payouts.name()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn list_requests(
        &self,
        actor: &Actor,
        status: Option<WithdrawalStatus>,
    ) -> WorkflowResult<Vec<WithdrawalRequest>> {
        self.ensure_can(actor, Action::ViewWithdrawals)?;
        Ok(self.store.list(status)?)
    }

    pub fn get_request(
        &self,
        actor: &Actor,
        request_id: &str,
    ) -> WorkflowResult<(WithdrawalRequest, Option<Transaction>)> {
        self.ensure_can(actor, Action::ViewWithdrawals)?;
        let request = self
            .store
            .get(request_id)?
            .ok_or_else(|| WorkflowError::NotFound(request_id.to_string()))?;
        let transaction = self.store.get_transaction(&request.transaction_id)?;
        Ok((request, transaction))
    }

    pub fn get_balance(
        &self,
        actor: &Actor,
        user_id: &str,
        token: &str,
    ) -> WorkflowResult<BalanceRecord> {
        self.ensure_can(actor, Action::ViewWithdrawals)?;
        Ok(self.ledger.get_balance(user_id, token)?)
    }

    pub fn audit_events(&self, actor: &Actor, query: &AuditQuery) -> WorkflowResult<Vec<AuditEvent>> {
        self.ensure_can(actor, Action::ViewWithdrawals)?;
        Ok(self.audit.query(query)?)
    }

    // =========================================================================
    // Tier one
    // =========================================================================

    /// Review a pending request. Re-checks the locked balance; moves no funds.
    pub fn admin_approve(&self, request_id: &str, actor: &Actor) -> WorkflowResult<WithdrawalRequest> {
        let action = Action::AdminApprove;
        self.ensure_can(actor, action)?;
        let request_id = require_id(request_id)?;
        self.throttle(actor, action, request_id)?;
        let _guard = self.begin(request_id, action)?;

        let (request, mut transaction) = self.load(request_id)?;
        ensure_transition(&request, WithdrawalStatus::AdminApproved, action)?;
        self.ensure_locked_covers(&request)?;

        let now = Utc::now();
        let mut approved = request.clone();
        approved
            .admin_approve(&actor.user_id, now)
            .map_err(|e| invalid_transition(request_id, e.from, action))?;
        transaction.status = TransactionStatus::Pending;
        transaction.updated_at = now;

        self.store
            .compare_and_swap(request.status, &approved, &transaction)
            .map_err(|e| conflict_error(e, request_id, action))?;

        info!(
            request_id,
            admin_id = %actor.user_id,
            amount = %approved.amount,
            "Withdrawal admin-approved"
        );
        self.record_audit(
            AuditEvent::new(AuditEventType::WithdrawalAdminApproved)
                .with_user(&actor.user_id)
                .with_resource(RESOURCE_TYPE, request_id)
                .with_details(json!({
                    "user_id": approved.user_id,
                    "amount": approved.amount.to_string(),
                    "coin_symbol": approved.coin_symbol,
                })),
        );
        self.send_notification(&UserNotification::approved(&approved));
        Ok(approved)
    }

    // =========================================================================
    // Tier two
    // =========================================================================

    /// Complete a request, either through the payout provider or on an
    /// operator's assertion that funds were sent.
    pub async fn process(
        &self,
        request_id: &str,
        actor: &Actor,
        mode: ProcessingType,
        tx_hash: Option<String>,
    ) -> WorkflowResult<Settlement> {
        self.process_as(Action::Process, request_id, actor, mode, tx_hash)
            .await
    }

    /// Manual completion, rate-limited separately from `process`.
    pub async fn mark_sent_manual(
        &self,
        request_id: &str,
        actor: &Actor,
        tx_hash: Option<String>,
    ) -> WorkflowResult<Settlement> {
        self.process_as(
            Action::MarkSentManual,
            request_id,
            actor,
            ProcessingType::Manual,
            tx_hash,
        )
        .await
    }

    async fn process_as(
        &self,
        action: Action,
        request_id: &str,
        actor: &Actor,
        mode: ProcessingType,
        tx_hash: Option<String>,
    ) -> WorkflowResult<Settlement> {
        self.ensure_can(actor, action)?;
        let request_id = require_id(request_id)?;
        let tx_hash = normalize_tx_hash(tx_hash)?;
        if mode == ProcessingType::Automatic && tx_hash.is_some() {
            return Err(WorkflowError::Validation(
                "tx_hash is only accepted for manual processing".to_string(),
            ));
        }
        self.throttle(actor, action, request_id)?;
        let _guard = self.begin(request_id, action)?;

        let (request, transaction) = self.load(request_id)?;
        ensure_transition(&request, WithdrawalStatus::Completed, action)?;
        let destination = match request.destination() {
            Ok(destination) => destination,
            Err(e) => {
                error!(
                    request_id,
                    error = %e,
                    "Withdrawal record has contradictory destination; refusing to settle"
                );
                let e = WorkflowError::from(e);
                self.record_failure(actor, action, request_id, &e);
                return Err(e);
            }
        };
        self.ensure_locked_covers(&request)?;

        // Internal transfers settle by ledger credit; no provider involved.
        let payout_address = match destination {
            Destination::External { to_address } if mode == ProcessingType::Automatic => {
                Some(to_address)
            }
            _ => None,
        };
        let dispatched = payout_address.is_some();
        let tx_hash = if let Some(to_address) = payout_address {
            match self.dispatch(&request, to_address).await {
                Ok(receipt) => Some(receipt.tx_hash),
                Err(e) => {
                    self.record_failure(actor, action, request_id, &e);
                    return Err(e);
                }
            }
        } else {
            tx_hash
        };

        let settlement = match self.settle(
            &request,
            destination,
            &transaction,
            actor,
            mode,
            tx_hash,
            action,
        ) {
            Ok(settlement) => settlement,
            Err(e) => {
                if dispatched {
                    error!(
                        request_id,
                        error = %e,
                        "Payout was dispatched but settlement failed; reconcile manually"
                    );
                }
                self.record_failure(actor, action, request_id, &e);
                return Err(e);
            }
        };

        let completed = &settlement.request;
        info!(
            request_id,
            super_admin_id = %actor.user_id,
            mode = ?mode,
            internal = completed.is_internal_transfer,
            tx_hash = settlement.transaction.tx_hash.as_deref().unwrap_or(""),
            "Withdrawal completed"
        );
        let event_type = if action == Action::MarkSentManual {
            AuditEventType::WithdrawalMarkedSent
        } else {
            AuditEventType::WithdrawalProcessed
        };
        self.record_audit(
            AuditEvent::new(event_type)
                .with_user(&actor.user_id)
                .with_resource(RESOURCE_TYPE, request_id)
                .with_details(json!({
                    "mode": mode,
                    "user_id": completed.user_id,
                    "amount": completed.amount.to_string(),
                    "coin_symbol": completed.coin_symbol,
                    "internal_transfer": completed.is_internal_transfer,
                    "recipient_user_id": completed.recipient_user_id,
                    "tx_hash": settlement.transaction.tx_hash,
                    "deposit_transaction_id": settlement.deposit.as_ref().map(|d| d.id.as_str()),
                })),
        );
        self.send_notification(&UserNotification::completed(completed));
        if let Some(notification) = UserNotification::deposit_received(completed) {
            self.send_notification(&notification);
        }
        Ok(settlement)
    }

    async fn dispatch(
        &self,
        request: &WithdrawalRequest,
        to_address: &str,
    ) -> WorkflowResult<PayoutReceipt> {
        let instruction = PayoutInstruction {
            request_id: request.id.clone(),
            to_address: to_address.to_string(),
            network: request.network.clone(),
            coin_symbol: request.coin_symbol.clone(),
            amount: request.amount,
            memo: request.memo.clone(),
        };

        let call = self.payouts.dispatch_payout(&instruction);
        match tokio::time::timeout(self.payout_timeout, call).await {
            Ok(Ok(receipt)) => Ok(receipt),
            Ok(Err(e)) => {
                warn!(
                    request_id = %request.id,
                    provider = self.payouts.name(),
                    error = %e,
                    "Payout provider failed; request left unchanged"
                );
                Err(e.into())
            }
            Err(_) => {
                warn!(
                    request_id = %request.id,
                    provider = self.payouts.name(),
                    timeout_ms = self.payout_timeout.as_millis() as u64,
                    "Payout provider timed out; request left unchanged"
                );
                Err(PayoutError::Timeout(self.payout_timeout.as_secs()).into())
            }
        }
    }

    /// Settlement saga:
    ///
    /// 1. `claim_request`: status check-and-set to `completed`
    /// 2. `settle_sender`: `unlock(Deduct)` on the sender
    /// 3. `credit_recipient`: internal transfers only
    /// 4. `record_deposit`: internal transfers only
    #[allow(clippy::too_many_arguments)]
    fn settle(
        &self,
        request: &WithdrawalRequest,
        destination: Destination<'_>,
        transaction: &Transaction,
        actor: &Actor,
        mode: ProcessingType,
        tx_hash: Option<String>,
        action: Action,
    ) -> WorkflowResult<Settlement> {
        let now = Utc::now();
        let mut completed = request.clone();
        completed
            .complete(&actor.user_id, mode, now)
            .map_err(|e| invalid_transition(&request.id, e.from, action))?;
        let mut completed_tx = transaction.clone();
        completed_tx.mark_completed(tx_hash, now);
        let deposit = Transaction::internal_deposit(&completed, &completed_tx, now);

        let ledger = self.ledger.as_ref();
        let store = self.store.as_ref();
        let original_status = request.status;
        let sender = request.user_id.as_str();
        let token = request.base_token_id.as_str();
        let amount = request.amount;

        let mut saga = Saga::<StepError>::new("settle_withdrawal")
            .compensable(
                "claim_request",
                || Ok(store.compare_and_swap(original_status, &completed, &completed_tx)?),
                || {
                    Ok(store.compare_and_swap(
                        WithdrawalStatus::Completed,
                        request,
                        transaction,
                    )?)
                },
            )
            .compensable(
                "settle_sender",
                move || {
                    ledger.unlock(sender, token, amount, UnlockMode::Deduct)?;
                    Ok(())
                },
                move || {
                    ledger.credit(sender, token, amount)?;
                    Ok(())
                },
            );

        if let (
            Destination::Internal {
                recipient_user_id: recipient,
            },
            Some(deposit),
        ) = (destination, deposit.as_ref())
        {
            saga = saga
                .compensable(
                    "credit_recipient",
                    move || {
                        ledger.credit(recipient, token, amount)?;
                        Ok(())
                    },
                    move || {
                        ledger.debit(recipient, token, amount)?;
                        Ok(())
                    },
                )
                .step("record_deposit", move || Ok(store.insert_transaction(deposit)?));
        }

        saga.run()
            .map_err(|failure| settlement_error(failure, &request.id, action))?;

        Ok(Settlement {
            request: completed,
            transaction: completed_tx,
            deposit,
        })
    }

    // =========================================================================
    // Reject
    // =========================================================================

    /// Reject a request and return its locked funds to the owner.
    pub fn reject(
        &self,
        request_id: &str,
        actor: &Actor,
        reason: &str,
    ) -> WorkflowResult<WithdrawalRequest> {
        let action = Action::Reject;
        self.ensure_can(actor, action)?;
        let request_id = require_id(request_id)?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(WorkflowError::Validation(
                "rejection reason is required".to_string(),
            ));
        }
        self.throttle(actor, action, request_id)?;
        let _guard = self.begin(request_id, action)?;

        let (request, transaction) = self.load(request_id)?;
        ensure_transition(&request, WithdrawalStatus::Rejected, action)?;
        self.ensure_locked_covers(&request)?;

        let now = Utc::now();
        let mut rejected = request.clone();
        rejected
            .reject(reason, now)
            .map_err(|e| invalid_transition(request_id, e.from, action))?;
        let mut cancelled_tx = transaction.clone();
        cancelled_tx.mark_cancelled(rejection_note(reason), now);

        let ledger = self.ledger.as_ref();
        let store = self.store.as_ref();
        let original_status = request.status;

        let outcome = Saga::<StepError>::new("reject_withdrawal")
            .compensable(
                "claim_request",
                || Ok(store.compare_and_swap(original_status, &rejected, &cancelled_tx)?),
                || {
                    Ok(store.compare_and_swap(
                        WithdrawalStatus::Rejected,
                        &request,
                        &transaction,
                    )?)
                },
            )
            .step("refund_sender", || {
                ledger.unlock(
                    &request.user_id,
                    &request.base_token_id,
                    request.amount,
                    UnlockMode::Refund,
                )?;
                Ok(())
            })
            .run()
            .map_err(|failure| settlement_error(failure, request_id, action));

        if let Err(e) = outcome {
            self.record_failure(actor, action, request_id, &e);
            return Err(e);
        }

        info!(
            request_id,
            admin_id = %actor.user_id,
            reason,
            "Withdrawal rejected; funds returned"
        );
        self.record_audit(
            AuditEvent::new(AuditEventType::WithdrawalRejected)
                .with_user(&actor.user_id)
                .with_resource(RESOURCE_TYPE, request_id)
                .with_details(json!({
                    "user_id": rejected.user_id,
                    "amount": rejected.amount.to_string(),
                    "reason": reason,
                    "previous_status": original_status,
                })),
        );
        self.send_notification(&UserNotification::rejected(&rejected, reason));
        Ok(rejected)
    }

    // =========================================================================
    // Gatekeeping helpers
    // =========================================================================

    fn ensure_can(&self, actor: &Actor, action: Action) -> WorkflowResult<()> {
        if actor.role.can(action) {
            return Ok(());
        }
        warn!(
            actor_id = %actor.user_id,
            role = %actor.role,
            action = %action,
            "Permission denied"
        );
        self.record_audit(
            AuditEvent::new(AuditEventType::PermissionDenied)
                .with_user(&actor.user_id)
                .with_details(json!({ "action": action, "role": actor.role }))
                .failed("permission denied"),
        );
        Err(WorkflowError::Forbidden {
            role: actor.role,
            action,
        })
    }

    /// Rate limit, applied once input has validated. Denials touch no
    /// request state.
    fn throttle(&self, actor: &Actor, action: Action, request_id: &str) -> WorkflowResult<()> {
        if let Err(limited) = self.rate_limiter.check(&actor.user_id, action) {
            warn!(
                actor_id = %actor.user_id,
                action = %action,
                request_id,
                retry_after_secs = limited.retry_after_secs,
                "Rate limit exceeded"
            );
            self.record_audit(
                AuditEvent::new(AuditEventType::RateLimitExceeded)
                    .with_user(&actor.user_id)
                    .with_resource(RESOURCE_TYPE, request_id)
                    .with_details(json!({
                        "action": action,
                        "retry_after_secs": limited.retry_after_secs,
                    }))
                    .failed("rate limited"),
            );
            return Err(WorkflowError::RateLimited {
                retry_after_secs: limited.retry_after_secs,
            });
        }
        Ok(())
    }

    fn begin(&self, request_id: &str, attempted: Action) -> WorkflowResult<InFlight<'_>> {
        if self.in_flight.insert(request_id.to_string()) {
            return Ok(InFlight {
                set: &self.in_flight,
                request_id: request_id.to_string(),
            });
        }
        let from = self
            .store
            .get(request_id)?
            .map(|r| r.status)
            .ok_or_else(|| WorkflowError::NotFound(request_id.to_string()))?;
        warn!(request_id, action = %attempted, "Another operation is in flight for this request");
        Err(invalid_transition(request_id, from, attempted))
    }

    fn load(&self, request_id: &str) -> WorkflowResult<(WithdrawalRequest, Transaction)> {
        let request = self
            .store
            .get(request_id)?
            .ok_or_else(|| WorkflowError::NotFound(request_id.to_string()))?;
        let transaction = self
            .store
            .get_transaction(&request.transaction_id)?
            .ok_or_else(|| {
                WorkflowError::Store(StoreError::NotFound(format!(
                    "transaction {} for request {request_id}",
                    request.transaction_id
                )))
            })?;
        Ok((request, transaction))
    }

    fn ensure_locked_covers(&self, request: &WithdrawalRequest) -> WorkflowResult<()> {
        let record = self
            .ledger
            .get_balance(&request.user_id, &request.base_token_id)?;
        if record.locked_balance >= request.amount {
            return Ok(());
        }
        error!(
            request_id = %request.id,
            user_id = %request.user_id,
            token = %request.base_token_id,
            locked = %record.locked_balance,
            requested = %request.amount,
            "Locked balance does not cover withdrawal; manual investigation required"
        );
        Err(WorkflowError::InsufficientLockedBalance {
            request_id: request.id.clone(),
            locked: record.locked_balance,
            requested: request.amount,
        })
    }

    // =========================================================================
    // Best-effort side channels
    // =========================================================================

    fn record_audit(&self, event: AuditEvent) {
        if let Err(e) = self.audit.record(&event) {
            warn!(
                event_type = ?event.event_type,
                resource_id = event.resource_id.as_deref().unwrap_or(""),
                error = %e,
                "Failed to write audit event"
            );
        }
    }

    fn record_failure(&self, actor: &Actor, action: Action, request_id: &str, err: &WorkflowError) {
        self.record_audit(
            AuditEvent::new(AuditEventType::WithdrawalFailed)
                .with_user(&actor.user_id)
                .with_resource(RESOURCE_TYPE, request_id)
                .with_details(json!({ "action": action }))
                .failed(err.to_string()),
        );
    }

    fn send_notification(&self, notification: &UserNotification) {
        if let Err(e) = self.notifier.notify(notification) {
            warn!(
                user_id = %notification.user_id,
                request_id = %notification.request_id,
                error = %e,
                "Failed to dispatch notification"
            );
        }
    }
}

fn require_id(request_id: &str) -> WorkflowResult<&str> {
    let trimmed = request_id.trim();
    if trimmed.is_empty() {
        return Err(WorkflowError::Validation("request id is required".to_string()));
    }
    Ok(trimmed)
}

fn normalize_tx_hash(tx_hash: Option<String>) -> WorkflowResult<Option<String>> {
    match tx_hash {
        None => Ok(None),
        Some(hash) => {
            let hash = hash.trim();
            if hash.is_empty() {
                Err(WorkflowError::Validation("tx_hash must not be blank".to_string()))
            } else {
                Ok(Some(hash.to_string()))
            }
        }
    }
}

fn invalid_transition(request_id: &str, from: WithdrawalStatus, attempted: Action) -> WorkflowError {
    WorkflowError::InvalidStateTransition {
        request_id: request_id.to_string(),
        from,
        attempted,
    }
}

fn ensure_transition(
    request: &WithdrawalRequest,
    to: WithdrawalStatus,
    attempted: Action,
) -> WorkflowResult<()> {
    if request.status.can_transition_to(to) {
        Ok(())
    } else {
        Err(invalid_transition(&request.id, request.status, attempted))
    }
}

fn conflict_error(err: StoreError, request_id: &str, attempted: Action) -> WorkflowError {
    match err {
        StoreError::StatusConflict { actual } => invalid_transition(request_id, actual, attempted),
        other => WorkflowError::Store(other),
    }
}

fn settlement_error(failure: SagaFailure<StepError>, request_id: &str, attempted: Action) -> WorkflowError {
    let SagaFailure {
        step,
        step_index,
        error: cause,
        compensation_errors,
    } = failure;

    if !compensation_errors.is_empty() {
        let err = WorkflowError::CompensationFailed {
            step,
            cause: cause.to_string(),
            compensation_errors: compensation_errors
                .iter()
                .map(|(name, e)| format!("{name}: {e}"))
                .collect(),
        };
        error!(request_id, error = %err, "Balances may be inconsistent; manual investigation required");
        return err;
    }

    match cause {
        StepError::Store(StoreError::StatusConflict { actual }) => {
            invalid_transition(request_id, actual, attempted)
        }
        StepError::Ledger(LedgerError::InsufficientLockedBalance { locked, requested }) => {
            error!(
                request_id,
                step,
                %locked,
                %requested,
                "Locked balance does not cover withdrawal; manual investigation required"
            );
            WorkflowError::InsufficientLockedBalance {
                request_id: request_id.to_string(),
                locked,
                requested,
            }
        }
        StepError::Store(e) if step_index == 0 => WorkflowError::Store(e),
        StepError::Ledger(e) if step_index == 0 => WorkflowError::Ledger(e),
        other => {
            warn!(request_id, step, error = %other, "Settlement reverted");
            WorkflowError::Rollback {
                step,
                cause: other.to_string(),
            }
        }
    }
}
