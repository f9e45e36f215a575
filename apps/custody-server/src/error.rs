// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::workflow::WorkflowError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error_code: &'static str,
    pub message: String,
    /// Seconds, sent as `Retry-After` on 429.
    pub retry_after: Option<u64>,
}

/// Error body returned by every endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    pub error_code: String,
}

impl ApiError {
    pub fn new(status: StatusCode, error_code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            error_code,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "validation_error", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        let message = err.to_string();
        match err {
            WorkflowError::Validation(_) => Self::bad_request(message),
            WorkflowError::NotFound(_) => Self::not_found(message),
            WorkflowError::Forbidden { .. } => {
                Self::new(StatusCode::FORBIDDEN, "forbidden", message)
            }
            WorkflowError::InvalidStateTransition { .. } => {
                Self::new(StatusCode::CONFLICT, "invalid_state_transition", message)
            }
            WorkflowError::RateLimited { retry_after_secs } => Self {
                retry_after: Some(retry_after_secs),
                ..Self::new(StatusCode::TOO_MANY_REQUESTS, "rate_limited", message)
            },
            WorkflowError::Provider(_) => {
                Self::new(StatusCode::BAD_GATEWAY, "payout_provider_error", message)
            }
            WorkflowError::InsufficientLockedBalance { .. } => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "insufficient_locked_balance",
                message,
            ),
            WorkflowError::Destination(_) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "inconsistent_request",
                message,
            ),
            WorkflowError::Rollback { .. } => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "settlement_rolled_back", message)
            }
            WorkflowError::CompensationFailed { .. } => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "compensation_failed", message)
            }
            WorkflowError::Ledger(_) | WorkflowError::Store(_) | WorkflowError::Audit(_) => {
                tracing::error!(error = %message, "Storage failure");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "storage_error",
                    "internal storage error",
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            error_code: self.error_code.to_string(),
        });
        let mut response = (self.status, body).into_response();
        if let Some(secs) = self.retry_after {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Action, Role};
    use crate::ledger::LedgerError;
    use crate::providers::PayoutError;
    use crate::withdrawal::{InvalidDestination, WithdrawalStatus};
    use axum::body::to_bytes;

    #[test]
    fn workflow_errors_map_to_status_codes() {
        let cases = [
            (WorkflowError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (WorkflowError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                WorkflowError::Forbidden {
                    role: Role::Admin,
                    action: Action::Process,
                },
                StatusCode::FORBIDDEN,
            ),
            (
                WorkflowError::InvalidStateTransition {
                    request_id: "wr_1".into(),
                    from: WithdrawalStatus::Completed,
                    attempted: Action::Reject,
                },
                StatusCode::CONFLICT,
            ),
            (
                WorkflowError::Provider(PayoutError::Timeout(30)),
                StatusCode::BAD_GATEWAY,
            ),
            (
                WorkflowError::Rollback {
                    step: "credit_recipient",
                    cause: "x".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                WorkflowError::Destination(InvalidDestination::UnexpectedRecipient("wr_1".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                WorkflowError::Ledger(LedgerError::Storage("disk".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn storage_details_are_not_leaked() {
        let err = ApiError::from(WorkflowError::Ledger(LedgerError::Storage(
            "redb: /data/custody.redb locked".into(),
        )));
        assert_eq!(err.message, "internal storage error");
    }

    #[tokio::test]
    async fn rate_limited_sets_retry_after() {
        let response =
            ApiError::from(WorkflowError::RateLimited { retry_after_secs: 42 }).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[RETRY_AFTER], "42");

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error_code"], "rate_limited");
    }
}
