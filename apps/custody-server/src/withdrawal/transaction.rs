// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User-visible transaction records.
//!
//! Every withdrawal request has exactly one withdrawal transaction whose
//! status mirrors the request. A completed internal transfer additionally
//! produces a deposit transaction for the recipient, linked back through
//! [`TransactionMetadata::sender_transaction_id`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{Destination, WithdrawalRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Withdrawal,
    Deposit,
}

/// Structured linkage fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TransactionMetadata {
    #[serde(default)]
    pub internal_transfer: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_transaction_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withdrawal_request_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    pub id: String,
    /// User whose history shows this record.
    pub user_id: String,
    pub kind: TransactionKind,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub coin_symbol: String,
    pub base_token_id: String,
    pub status: TransactionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_address: Option<String>,
    /// User-facing explanation (e.g. rejection reason).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub metadata: TransactionMetadata,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// The withdrawal transaction mirroring `request`.
    pub fn for_withdrawal(request: &WithdrawalRequest) -> Self {
        Self {
            id: request.transaction_id.clone(),
            user_id: request.user_id.clone(),
            kind: TransactionKind::Withdrawal,
            amount: request.amount,
            coin_symbol: request.coin_symbol.clone(),
            base_token_id: request.base_token_id.clone(),
            status: TransactionStatus::Pending,
            tx_hash: None,
            to_address: request.to_address.clone(),
            notes: None,
            metadata: TransactionMetadata {
                internal_transfer: request.is_internal_transfer,
                recipient_user_id: request.recipient_user_id.clone(),
                withdrawal_request_id: Some(request.id.clone()),
                ..Default::default()
            },
            created_at: request.created_at,
            completed_at: None,
            updated_at: request.created_at,
        }
    }

    /// Deposit shown to the recipient of a completed internal transfer.
    /// Returns `None` unless `request` resolves to an internal destination.
    pub fn internal_deposit(
        request: &WithdrawalRequest,
        sender_tx: &Transaction,
        at: DateTime<Utc>,
    ) -> Option<Self> {
        let Ok(Destination::Internal {
            recipient_user_id: recipient,
        }) = request.destination()
        else {
            return None;
        };
        Some(Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: recipient.to_string(),
            kind: TransactionKind::Deposit,
            amount: request.amount,
            coin_symbol: request.coin_symbol.clone(),
            base_token_id: request.base_token_id.clone(),
            status: TransactionStatus::Completed,
            tx_hash: sender_tx.tx_hash.clone(),
            to_address: None,
            notes: Some(format!(
                "Internal transfer of {} {} received",
                request.amount, request.coin_symbol
            )),
            metadata: TransactionMetadata {
                internal_transfer: true,
                sender_user_id: Some(request.user_id.clone()),
                sender_transaction_id: Some(sender_tx.id.clone()),
                recipient_user_id: Some(recipient.to_string()),
                withdrawal_request_id: Some(request.id.clone()),
            },
            created_at: at,
            completed_at: Some(at),
            updated_at: at,
        })
    }

    pub fn mark_completed(&mut self, tx_hash: Option<String>, at: DateTime<Utc>) {
        self.status = TransactionStatus::Completed;
        if tx_hash.is_some() {
            self.tx_hash = tx_hash;
        }
        self.completed_at = Some(at);
        self.updated_at = at;
    }

    pub fn mark_cancelled(&mut self, notes: String, at: DateTime<Utc>) {
        self.status = TransactionStatus::Cancelled;
        self.notes = Some(notes);
        self.updated_at = at;
    }
}

/// Note shown to the user on a rejected withdrawal.
pub fn rejection_note(reason: &str) -> String {
    format!("Withdrawal rejected: {reason}. Funds have been returned to your balance.")
}
