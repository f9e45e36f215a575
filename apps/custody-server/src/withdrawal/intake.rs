// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Opening a withdrawal request.
//!
//! Request creation happens upstream of the approval workflow: the amount
//! is locked first, then the pending request and its transaction are
//! persisted. Every request the engine sees therefore already holds
//! `amount` in the owner's `locked_balance`.

use tracing::{error, info};

use super::{
    InvalidDestination, StoreError, Transaction, WithdrawalRequest, WithdrawalStatus,
    WithdrawalStore,
};
use crate::ledger::{Ledger, LedgerError, UnlockMode};

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("request must be pending, got {0}")]
    NotPending(WithdrawalStatus),

    #[error(transparent)]
    Destination(#[from] InvalidDestination),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Lock the request amount and persist the pending request.
///
/// If persisting fails the lock is released again.
pub fn open_request(
    ledger: &dyn Ledger,
    store: &dyn WithdrawalStore,
    request: &WithdrawalRequest,
) -> Result<Transaction, IntakeError> {
    if request.status != WithdrawalStatus::Pending {
        return Err(IntakeError::NotPending(request.status));
    }
    request.destination()?;

    ledger.lock(&request.user_id, &request.base_token_id, request.amount)?;

    let transaction = Transaction::for_withdrawal(request);
    if let Err(e) = store.insert(request, &transaction) {
        if let Err(unlock_err) = ledger.unlock(
            &request.user_id,
            &request.base_token_id,
            request.amount,
            UnlockMode::Refund,
        ) {
            error!(
                request_id = %request.id,
                user_id = %request.user_id,
                error = %unlock_err,
                "Failed to release lock after intake failure"
            );
        }
        return Err(e.into());
    }

    info!(
        request_id = %request.id,
        user_id = %request.user_id,
        amount = %request.amount,
        internal = request.is_internal_transfer,
        "Withdrawal request opened"
    );
    Ok(transaction)
}
