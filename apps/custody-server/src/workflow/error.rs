// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use rust_decimal::Decimal;

use crate::auth::roles::{Action, Role};
use crate::ledger::LedgerError;
use crate::providers::PayoutError;
use crate::storage::audit::AuditError;
use crate::withdrawal::{InvalidDestination, StoreError, WithdrawalStatus};

/// Errors surfaced by the approval workflow.
///
/// Every variant states the net effect for the caller: either nothing
/// happened, or something happened and was reverted. The only exception is
/// [`WorkflowError::CompensationFailed`], which needs manual investigation.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("withdrawal request not found: {0}")]
    NotFound(String),

    #[error("role {role} may not {action}")]
    Forbidden { role: Role, action: Action },

    #[error("cannot {attempted} withdrawal {request_id} in status {from}")]
    InvalidStateTransition {
        request_id: String,
        from: WithdrawalStatus,
        attempted: Action,
    },

    /// Locked funds do not cover the request. Points at an upstream locking
    /// bug; never retried automatically.
    #[error("insufficient locked balance for {request_id}: locked {locked}, requested {requested}")]
    InsufficientLockedBalance {
        request_id: String,
        locked: Decimal,
        requested: Decimal,
    },

    /// The stored request's destination fields contradict each other.
    /// Refused before any payout or ledger call.
    #[error("refusing to settle: {0}")]
    Destination(#[from] InvalidDestination),

    /// Automatic payout failed; no balance or status was touched.
    #[error("payout provider error: {0}")]
    Provider(#[from] PayoutError),

    /// A settlement step failed after earlier steps applied; all of them
    /// were reverted.
    #[error("settlement failed at {step} and was reverted: {cause}")]
    Rollback { step: &'static str, cause: String },

    /// A settlement step failed and reverting it failed too.
    #[error("settlement failed at {step} ({cause}); compensation failed: {}", .compensation_errors.join("; "))]
    CompensationFailed {
        step: &'static str,
        cause: String,
        compensation_errors: Vec<String>,
    },

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Audit(#[from] AuditError),
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;
