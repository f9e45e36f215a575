// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Withdrawal request lifecycle.
//!
//! ```text
//!   pending ──► admin_approved ──► completed
//!      │  ╲                            ▲
//!      │   ╲───────────────────────────┘   (super-admin may skip tier 1)
//!      ▼              │
//!   rejected ◄────────┘
//! ```
//!
//! `completed` and `rejected` are terminal. Any other transition is an
//! [`InvalidTransition`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Withdrawal request status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStatus {
    /// Created with funds locked, awaiting review.
    Pending,
    /// Reviewed by an admin, awaiting super-admin processing.
    AdminApproved,
    /// Funds sent and settled.
    Completed,
    /// Rejected; locked funds returned to the user.
    Rejected,
}

impl WithdrawalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::AdminApproved => "admin_approved",
            WithdrawalStatus::Completed => "completed",
            WithdrawalStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(WithdrawalStatus::Pending),
            "admin_approved" => Some(WithdrawalStatus::AdminApproved),
            "completed" => Some(WithdrawalStatus::Completed),
            "rejected" => Some(WithdrawalStatus::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WithdrawalStatus::Completed | WithdrawalStatus::Rejected)
    }

    pub fn can_transition_to(&self, next: WithdrawalStatus) -> bool {
        use WithdrawalStatus::*;
        matches!(
            (self, next),
            (Pending, AdminApproved)
                | (Pending, Completed)
                | (AdminApproved, Completed)
                | (Pending, Rejected)
                | (AdminApproved, Rejected)
        )
    }
}

impl std::fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a super-admin completed the withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingType {
    /// Dispatched through the payout provider.
    Automatic,
    /// Sent off-platform by an operator and confirmed by hand.
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot move withdrawal from {from} to {to}")]
pub struct InvalidTransition {
    pub from: WithdrawalStatus,
    pub to: WithdrawalStatus,
}

/// Where a request's funds go. Derived from the stored record by
/// [`WithdrawalRequest::destination`]; every settlement branch keys off it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination<'a> {
    /// Paid out to an address outside the platform.
    External { to_address: &'a str },
    /// Settled by ledger credit to another platform user.
    Internal { recipient_user_id: &'a str },
}

/// The destination fields of a request contradict each other.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidDestination {
    #[error("internal transfer {0} has no recipient")]
    MissingRecipient(String),

    #[error("internal transfer {0} is addressed to its own sender")]
    SelfTransfer(String),

    #[error("internal transfer {0} also names an external address")]
    UnexpectedAddress(String),

    #[error("external withdrawal {0} has no destination address")]
    MissingAddress(String),

    #[error("external withdrawal {0} also names a recipient user")]
    UnexpectedRecipient(String),
}

/// A user's withdrawal intent. Never deleted; terminal requests are kept
/// for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WithdrawalRequest {
    pub id: String,
    /// Owner and sender of the funds.
    pub user_id: String,
    /// Receiving platform user, present iff `is_internal_transfer`.
    /// Read through [`WithdrawalRequest::destination`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_user_id: Option<String>,
    pub is_internal_transfer: bool,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub coin_symbol: String,
    pub base_token_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    /// External destination; absent for internal transfers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    /// Linked ledger-visible transaction.
    pub transaction_id: String,
    pub status: WithdrawalStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_type: Option<ProcessingType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_approved_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_approved_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub super_admin_approved_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub super_admin_approved_at: Option<DateTime<Utc>>,
    pub was_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WithdrawalRequest {
    /// New pending request for an external address.
    pub fn new_external(
        user_id: impl Into<String>,
        amount: Decimal,
        coin_symbol: impl Into<String>,
        base_token_id: impl Into<String>,
        network: Option<String>,
        to_address: impl Into<String>,
        memo: Option<String>,
    ) -> Self {
        let mut request = Self::new_pending(user_id.into(), amount, coin_symbol.into(), base_token_id.into());
        request.network = network;
        request.to_address = Some(to_address.into());
        request.memo = memo;
        request
    }

    /// New pending request whose destination is another platform user.
    pub fn new_internal(
        user_id: impl Into<String>,
        recipient_user_id: impl Into<String>,
        amount: Decimal,
        coin_symbol: impl Into<String>,
        base_token_id: impl Into<String>,
    ) -> Self {
        let mut request = Self::new_pending(user_id.into(), amount, coin_symbol.into(), base_token_id.into());
        request.recipient_user_id = Some(recipient_user_id.into());
        request.is_internal_transfer = true;
        request
    }

    fn new_pending(user_id: String, amount: Decimal, coin_symbol: String, base_token_id: String) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            recipient_user_id: None,
            is_internal_transfer: false,
            amount,
            coin_symbol,
            base_token_id,
            network: None,
            to_address: None,
            memo: None,
            transaction_id: uuid::Uuid::new_v4().to_string(),
            status: WithdrawalStatus::Pending,
            processing_type: None,
            admin_approved_by: None,
            admin_approved_at: None,
            super_admin_approved_by: None,
            super_admin_approved_at: None,
            was_sent: false,
            sent_at: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Resolve the destination, refusing records where
    /// `is_internal_transfer`, `recipient_user_id` and `to_address` disagree.
    pub fn destination(&self) -> Result<Destination<'_>, InvalidDestination> {
        let id = || self.id.clone();
        if self.is_internal_transfer {
            let recipient = self
                .recipient_user_id
                .as_deref()
                .ok_or_else(|| InvalidDestination::MissingRecipient(id()))?;
            if recipient == self.user_id {
                return Err(InvalidDestination::SelfTransfer(id()));
            }
            if self.to_address.is_some() {
                return Err(InvalidDestination::UnexpectedAddress(id()));
            }
            Ok(Destination::Internal {
                recipient_user_id: recipient,
            })
        } else {
            if self.recipient_user_id.is_some() {
                return Err(InvalidDestination::UnexpectedRecipient(id()));
            }
            let to_address = self
                .to_address
                .as_deref()
                .ok_or_else(|| InvalidDestination::MissingAddress(id()))?;
            Ok(Destination::External { to_address })
        }
    }

    fn transition(&mut self, to: WithdrawalStatus, at: DateTime<Utc>) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(to) {
            return Err(InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.updated_at = at;
        Ok(())
    }

    /// Tier-one approval. Moves no funds.
    pub fn admin_approve(&mut self, admin_id: &str, at: DateTime<Utc>) -> Result<(), InvalidTransition> {
        self.transition(WithdrawalStatus::AdminApproved, at)?;
        self.admin_approved_by = Some(admin_id.to_string());
        self.admin_approved_at = Some(at);
        Ok(())
    }

    /// Tier-two completion. Backfills the admin approval when the
    /// super-admin processed straight from `pending`.
    pub fn complete(
        &mut self,
        super_admin_id: &str,
        processing_type: ProcessingType,
        at: DateTime<Utc>,
    ) -> Result<(), InvalidTransition> {
        self.transition(WithdrawalStatus::Completed, at)?;
        self.processing_type = Some(processing_type);
        self.super_admin_approved_by = Some(super_admin_id.to_string());
        self.super_admin_approved_at = Some(at);
        self.was_sent = true;
        self.sent_at = Some(at);
        if self.admin_approved_by.is_none() {
            self.admin_approved_by = Some(super_admin_id.to_string());
            self.admin_approved_at = Some(at);
        }
        Ok(())
    }

    pub fn reject(&mut self, reason: &str, at: DateTime<Utc>) -> Result<(), InvalidTransition> {
        self.transition(WithdrawalStatus::Rejected, at)?;
        self.rejection_reason = Some(reason.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn pending() -> WithdrawalRequest {
        WithdrawalRequest::new_external("user_1", dec!(40), "USDT", "USDT", Some("tron".into()), "TAddr", None)
    }

    #[test]
    fn only_documented_transitions_are_allowed() {
        use WithdrawalStatus::*;
        let all = [Pending, AdminApproved, Completed, Rejected];
        let allowed = [
            (Pending, AdminApproved),
            (Pending, Completed),
            (Pending, Rejected),
            (AdminApproved, Completed),
            (AdminApproved, Rejected),
        ];
        for from in all {
            for to in all {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn admin_approve_stamps_approver() {
        let mut request = pending();
        let now = Utc::now();
        request.admin_approve("admin_1", now).unwrap();
        assert_eq!(request.status, WithdrawalStatus::AdminApproved);
        assert_eq!(request.admin_approved_by.as_deref(), Some("admin_1"));
        assert_eq!(request.admin_approved_at, Some(now));
    }

    #[test]
    fn complete_from_pending_backfills_admin_approval() {
        let mut request = pending();
        request.complete("super_1", ProcessingType::Manual, Utc::now()).unwrap();
        assert_eq!(request.status, WithdrawalStatus::Completed);
        assert_eq!(request.admin_approved_by.as_deref(), Some("super_1"));
        assert_eq!(request.super_admin_approved_by.as_deref(), Some("super_1"));
        assert!(request.was_sent);
        assert!(request.sent_at.is_some());
    }

    #[test]
    fn complete_keeps_existing_admin_approval() {
        let mut request = pending();
        request.admin_approve("admin_1", Utc::now()).unwrap();
        request.complete("super_1", ProcessingType::Automatic, Utc::now()).unwrap();
        assert_eq!(request.admin_approved_by.as_deref(), Some("admin_1"));
        assert_eq!(request.processing_type, Some(ProcessingType::Automatic));
    }

    #[test]
    fn terminal_states_reject_further_transitions() {
        let mut request = pending();
        request.reject("duplicate", Utc::now()).unwrap();
        let err = request.admin_approve("admin_1", Utc::now()).unwrap_err();
        assert_eq!(
            err,
            InvalidTransition {
                from: WithdrawalStatus::Rejected,
                to: WithdrawalStatus::AdminApproved
            }
        );
        assert!(request.admin_approved_by.is_none());
    }

    #[test]
    fn destination_follows_request_kind() {
        let external = pending();
        assert_eq!(
            external.destination(),
            Ok(Destination::External { to_address: "TAddr" })
        );

        let internal = WithdrawalRequest::new_internal("user_1", "user_2", dec!(5), "USDT", "USDT");
        assert_eq!(
            internal.destination(),
            Ok(Destination::Internal {
                recipient_user_id: "user_2"
            })
        );
    }

    #[test]
    fn contradictory_destination_fields_are_refused() {
        let mut external_with_recipient = pending();
        external_with_recipient.recipient_user_id = Some("user_2".into());
        assert!(matches!(
            external_with_recipient.destination(),
            Err(InvalidDestination::UnexpectedRecipient(_))
        ));

        let mut external_without_address = pending();
        external_without_address.to_address = None;
        assert!(matches!(
            external_without_address.destination(),
            Err(InvalidDestination::MissingAddress(_))
        ));

        let mut internal_without_recipient =
            WithdrawalRequest::new_internal("user_1", "user_2", dec!(5), "USDT", "USDT");
        internal_without_recipient.recipient_user_id = None;
        assert!(matches!(
            internal_without_recipient.destination(),
            Err(InvalidDestination::MissingRecipient(_))
        ));

        let mut internal_with_address =
            WithdrawalRequest::new_internal("user_1", "user_2", dec!(5), "USDT", "USDT");
        internal_with_address.to_address = Some("TAddr".into());
        assert!(matches!(
            internal_with_address.destination(),
            Err(InvalidDestination::UnexpectedAddress(_))
        ));

        let self_transfer = WithdrawalRequest::new_internal("user_1", "user_1", dec!(5), "USDT", "USDT");
        assert!(matches!(
            self_transfer.destination(),
            Err(InvalidDestination::SelfTransfer(_))
        ));
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&WithdrawalStatus::AdminApproved).unwrap();
        assert_eq!(json, "\"admin_approved\"");
        assert_eq!(WithdrawalStatus::from_str("admin_approved"), Some(WithdrawalStatus::AdminApproved));
        assert_eq!(WithdrawalStatus::from_str("sent"), None);
    }
}
