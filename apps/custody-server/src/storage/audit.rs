// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit trail for privileged withdrawal operations.
//!
//! Every approval, processing, rejection and denied attempt is recorded as
//! an [`AuditEvent`]. Recording is best-effort from the caller's point of
//! view: the workflow engine logs a failed write and carries on.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Types of auditable events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // Withdrawal workflow
    WithdrawalAdminApproved,
    WithdrawalProcessed,
    WithdrawalMarkedSent,
    WithdrawalRejected,
    WithdrawalFailed,

    // Gatekeeping
    RateLimitExceeded,
    PermissionDenied,
}

impl AuditEventType {
    pub fn from_str(s: &str) -> Option<Self> {
        serde_json::from_value(serde_json::Value::String(s.to_string())).ok()
    }
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct AuditEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    /// Actor who triggered the event.
    pub user_id: Option<String>,
    /// Affected resource (withdrawal request id).
    pub resource_id: Option<String>,
    pub resource_type: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
    pub success: bool,
    pub error: Option<String>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            user_id: None,
            resource_id: None,
            resource_type: None,
            details: None,
            success: true,
            error: None,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_resource(
        mut self,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        self.resource_type = Some(resource_type.into());
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Mark as failed with error message.
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("audit storage error: {0}")]
pub struct AuditError(pub String);

/// Filter for reading the audit trail. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub actor_id: Option<String>,
    pub event_type: Option<AuditEventType>,
    pub resource_id: Option<String>,
    pub offset: usize,
    /// `0` means no limit.
    pub limit: usize,
}

impl AuditQuery {
    pub fn matches(&self, event: &AuditEvent) -> bool {
        self.start.is_none_or(|s| event.timestamp >= s)
            && self.end.is_none_or(|e| event.timestamp <= e)
            && self
                .actor_id
                .as_deref()
                .is_none_or(|a| event.user_id.as_deref() == Some(a))
            && self.event_type.is_none_or(|t| event.event_type == t)
            && self
                .resource_id
                .as_deref()
                .is_none_or(|r| event.resource_id.as_deref() == Some(r))
    }

    /// Filter, then page through `events` (assumed oldest first).
    pub fn apply(&self, events: impl IntoIterator<Item = AuditEvent>) -> Vec<AuditEvent> {
        let limit = if self.limit == 0 { usize::MAX } else { self.limit };
        events
            .into_iter()
            .filter(|e| self.matches(e))
            .skip(self.offset)
            .take(limit)
            .collect()
    }
}

/// Destination for audit events.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: &AuditEvent) -> Result<(), AuditError>;

    /// Events matching `query`, oldest first.
    fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEvent>, AuditError>;
}

/// In-process audit trail.
#[derive(Default)]
pub struct InMemoryAuditLog {
    events: Mutex<Vec<AuditEvent>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.guard().clone()
    }

    fn guard(&self) -> MutexGuard<'_, Vec<AuditEvent>> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl AuditSink for InMemoryAuditLog {
    fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        self.guard().push(event.clone());
        Ok(())
    }

    fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEvent>, AuditError> {
        Ok(query.apply(self.events()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn create_audit_event() {
        let event = AuditEvent::new(AuditEventType::WithdrawalAdminApproved)
            .with_user("admin_1")
            .with_resource("withdrawal_request", "req_1");

        assert_eq!(event.event_type, AuditEventType::WithdrawalAdminApproved);
        assert_eq!(event.user_id.as_deref(), Some("admin_1"));
        assert_eq!(event.resource_id.as_deref(), Some("req_1"));
        assert!(event.success);
    }

    #[test]
    fn failed_event() {
        let event = AuditEvent::new(AuditEventType::RateLimitExceeded)
            .with_user("admin_1")
            .failed("rate limited");

        assert!(!event.success);
        assert_eq!(event.error.as_deref(), Some("rate limited"));
    }

    #[test]
    fn event_type_parses_from_wire_name() {
        assert_eq!(
            AuditEventType::from_str("withdrawal_rejected"),
            Some(AuditEventType::WithdrawalRejected)
        );
        assert_eq!(AuditEventType::from_str("wallet_created"), None);
    }

    #[test]
    fn query_filters_and_pages() {
        let log = InMemoryAuditLog::new();
        for i in 0..5 {
            let actor = if i % 2 == 0 { "admin_a" } else { "admin_b" };
            log.record(
                &AuditEvent::new(AuditEventType::WithdrawalAdminApproved)
                    .with_user(actor)
                    .with_resource("withdrawal_request", format!("req_{i}")),
            )
            .unwrap();
        }

        let by_actor = log
            .query(&AuditQuery {
                actor_id: Some("admin_a".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_actor.len(), 3);

        let paged = log
            .query(&AuditQuery {
                offset: 1,
                limit: 2,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(paged.len(), 2);
        assert_eq!(paged[0].resource_id.as_deref(), Some("req_1"));
    }

    #[test]
    fn query_respects_time_window() {
        let log = InMemoryAuditLog::new();
        let mut old = AuditEvent::new(AuditEventType::WithdrawalRejected);
        old.timestamp = Utc::now() - Duration::days(3);
        log.record(&old).unwrap();
        log.record(&AuditEvent::new(AuditEventType::WithdrawalRejected))
            .unwrap();

        let recent = log
            .query(&AuditQuery {
                start: Some(Utc::now() - Duration::days(1)),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(recent.len(), 1);
    }
}
