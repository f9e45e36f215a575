// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User notifications for withdrawal outcomes.
//!
//! Delivery (push, email) lives outside this service; the engine hands a
//! [`UserNotification`] to a [`Notifier`] after each successful operation
//! and ignores delivery failures beyond logging them.

use serde::Serialize;
use tracing::info;

use crate::withdrawal::{Destination, WithdrawalRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    WithdrawalApproved,
    WithdrawalCompleted,
    WithdrawalRejected,
    DepositReceived,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserNotification {
    pub user_id: String,
    pub kind: NotificationKind,
    pub request_id: String,
    pub title: String,
    pub message: String,
}

impl UserNotification {
    pub fn approved(request: &WithdrawalRequest) -> Self {
        Self {
            user_id: request.user_id.clone(),
            kind: NotificationKind::WithdrawalApproved,
            request_id: request.id.clone(),
            title: "Withdrawal approved".to_string(),
            message: format!(
                "Your withdrawal of {} {} has been approved and is awaiting processing.",
                request.amount, request.coin_symbol
            ),
        }
    }

    pub fn completed(request: &WithdrawalRequest) -> Self {
        let destination = match request.destination() {
            Ok(Destination::Internal { .. }) => "to the recipient".to_string(),
            Ok(Destination::External { to_address }) => format!("to {to_address}"),
            Err(_) => String::new(),
        };
        Self {
            user_id: request.user_id.clone(),
            kind: NotificationKind::WithdrawalCompleted,
            request_id: request.id.clone(),
            title: "Withdrawal sent".to_string(),
            message: format!(
                "Your withdrawal of {} {} has been sent {destination}.",
                request.amount, request.coin_symbol
            ),
        }
    }

    pub fn rejected(request: &WithdrawalRequest, reason: &str) -> Self {
        Self {
            user_id: request.user_id.clone(),
            kind: NotificationKind::WithdrawalRejected,
            request_id: request.id.clone(),
            title: "Withdrawal rejected".to_string(),
            message: crate::withdrawal::rejection_note(reason),
        }
    }

    /// Notification for the recipient of an internal transfer. `None` for
    /// external withdrawals.
    pub fn deposit_received(request: &WithdrawalRequest) -> Option<Self> {
        let Ok(Destination::Internal { recipient_user_id }) = request.destination() else {
            return None;
        };
        Some(Self {
            user_id: recipient_user_id.to_string(),
            kind: NotificationKind::DepositReceived,
            request_id: request.id.clone(),
            title: "Funds received".to_string(),
            message: format!(
                "You received {} {} from another user.",
                request.amount, request.coin_symbol
            ),
        })
    }
}

#[derive(Debug, thiserror::Error)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &UserNotification) -> Result<(), NotifyError>;
}

/// Writes notifications to the operational log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &UserNotification) -> Result<(), NotifyError> {
        info!(
            user_id = %notification.user_id,
            kind = ?notification.kind,
            request_id = %notification.request_id,
            "{}",
            notification.title
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rejected_message_embeds_reason() {
        let request = WithdrawalRequest::new_external("u1", dec!(40), "USDT", "USDT", None, "TAddr", None);
        let n = UserNotification::rejected(&request, "sanctioned address");
        assert_eq!(n.user_id, "u1");
        assert!(n.message.contains("sanctioned address"));
        assert!(n.message.contains("returned to your balance"));
    }

    #[test]
    fn deposit_notification_targets_recipient() {
        let request = WithdrawalRequest::new_internal("sender", "recipient", dec!(40), "USDT", "USDT");
        let n = UserNotification::deposit_received(&request).unwrap();
        assert_eq!(n.user_id, "recipient");
        assert_eq!(n.kind, NotificationKind::DepositReceived);
    }

    #[test]
    fn completed_message_names_address() {
        let request = WithdrawalRequest::new_external("u1", dec!(1), "USDT", "USDT", None, "TAddr", None);
        assert!(UserNotification::completed(&request).message.contains("to TAddr"));
    }
}
