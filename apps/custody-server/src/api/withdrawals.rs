// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Withdrawal queue and approval endpoints.
//!
//! Every route requires a staff token. Which staff role may perform which
//! operation is decided by the workflow engine:
//! - `admin` / `super_admin`: list, detail, approve, reject
//! - `super_admin` only: process, mark-sent

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::AdminOnly,
    error::ApiError,
    state::AppState,
    withdrawal::{ProcessingType, Transaction, WithdrawalRequest, WithdrawalStatus},
    workflow::Settlement,
};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListWithdrawalsParams {
    /// Filter by status (`pending`, `admin_approved`, `completed`, `rejected`).
    pub status: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WithdrawalListResponse {
    /// Requests, oldest first.
    pub requests: Vec<WithdrawalRequest>,
    pub total: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WithdrawalDetailResponse {
    pub request: WithdrawalRequest,
    /// Linked transaction record.
    pub transaction: Option<Transaction>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProcessWithdrawalRequest {
    /// `automatic` dispatches through the payout provider; `manual` records
    /// an operator-sent payout.
    pub mode: ProcessingType,
    /// On-chain hash of a manual payout.
    #[serde(default)]
    pub tx_hash: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MarkSentRequest {
    #[serde(default)]
    pub tx_hash: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RejectWithdrawalRequest {
    /// Shown to the user; required.
    pub reason: String,
}

/// Outcome of a state-changing call.
#[derive(Debug, Serialize, ToSchema)]
pub struct WithdrawalActionResponse {
    pub request_id: String,
    pub status: WithdrawalStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
    /// Recipient deposit created by an internal transfer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deposit_transaction_id: Option<String>,
}

impl From<&WithdrawalRequest> for WithdrawalActionResponse {
    fn from(request: &WithdrawalRequest) -> Self {
        Self {
            request_id: request.id.clone(),
            status: request.status,
            tx_hash: None,
            sent_at: request.sent_at,
            deposit_transaction_id: None,
        }
    }
}

impl From<Settlement> for WithdrawalActionResponse {
    fn from(settlement: Settlement) -> Self {
        Self {
            tx_hash: settlement.transaction.tx_hash,
            deposit_transaction_id: settlement.deposit.map(|d| d.id),
            ..Self::from(&settlement.request)
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// List withdrawal requests.
#[utoipa::path(
    get,
    path = "/v1/admin/withdrawals",
    tag = "Withdrawals",
    params(ListWithdrawalsParams),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Withdrawal requests", body = WithdrawalListResponse),
        (status = 400, description = "Unknown status filter"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (staff required)")
    )
)]
pub async fn list_withdrawals(
    AdminOnly(user): AdminOnly,
    State(state): State<AppState>,
    Query(params): Query<ListWithdrawalsParams>,
) -> Result<Json<WithdrawalListResponse>, ApiError> {
    let status = match params.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        None => None,
        Some(raw) => Some(
            WithdrawalStatus::from_str(raw)
                .ok_or_else(|| ApiError::bad_request(format!("unknown status: {raw}")))?,
        ),
    };

    let requests = state.engine.list_requests(&user.actor(), status)?;
    Ok(Json(WithdrawalListResponse {
        total: requests.len(),
        requests,
    }))
}

/// Get one withdrawal request and its transaction.
#[utoipa::path(
    get,
    path = "/v1/admin/withdrawals/{request_id}",
    tag = "Withdrawals",
    params(("request_id" = String, Path, description = "Withdrawal request ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Withdrawal request", body = WithdrawalDetailResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (staff required)"),
        (status = 404, description = "Request not found")
    )
)]
pub async fn get_withdrawal(
    AdminOnly(user): AdminOnly,
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<Json<WithdrawalDetailResponse>, ApiError> {
    let (request, transaction) = state.engine.get_request(&user.actor(), &request_id)?;
    Ok(Json(WithdrawalDetailResponse {
        request,
        transaction,
    }))
}

/// Tier-one approval. Moves no funds.
#[utoipa::path(
    post,
    path = "/v1/admin/withdrawals/{request_id}/approve",
    tag = "Withdrawals",
    params(("request_id" = String, Path, description = "Withdrawal request ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Request approved", body = WithdrawalActionResponse),
        (status = 403, description = "Role may not approve"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request is not pending"),
        (status = 429, description = "Rate limited")
    )
)]
pub async fn approve_withdrawal(
    AdminOnly(user): AdminOnly,
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<Json<WithdrawalActionResponse>, ApiError> {
    let approved = state.engine.admin_approve(&request_id, &user.actor())?;
    Ok(Json(WithdrawalActionResponse::from(&approved)))
}

/// Tier-two processing. Settles the request and moves funds.
#[utoipa::path(
    post,
    path = "/v1/admin/withdrawals/{request_id}/process",
    tag = "Withdrawals",
    params(("request_id" = String, Path, description = "Withdrawal request ID")),
    request_body = ProcessWithdrawalRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Withdrawal completed", body = WithdrawalActionResponse),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "super_admin required"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request is already settled or being processed"),
        (status = 429, description = "Rate limited"),
        (status = 502, description = "Payout provider failed; nothing changed"),
        (status = 500, description = "Settlement failed")
    )
)]
pub async fn process_withdrawal(
    AdminOnly(user): AdminOnly,
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    Json(body): Json<ProcessWithdrawalRequest>,
) -> Result<Json<WithdrawalActionResponse>, ApiError> {
    let settlement = state
        .engine
        .process(&request_id, &user.actor(), body.mode, body.tx_hash)
        .await?;
    Ok(Json(settlement.into()))
}

/// Record a payout that an operator sent outside the service.
#[utoipa::path(
    post,
    path = "/v1/admin/withdrawals/{request_id}/mark-sent",
    tag = "Withdrawals",
    params(("request_id" = String, Path, description = "Withdrawal request ID")),
    request_body = MarkSentRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Withdrawal completed", body = WithdrawalActionResponse),
        (status = 403, description = "super_admin required"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request is already settled or being processed"),
        (status = 429, description = "Rate limited")
    )
)]
pub async fn mark_withdrawal_sent(
    AdminOnly(user): AdminOnly,
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    Json(body): Json<MarkSentRequest>,
) -> Result<Json<WithdrawalActionResponse>, ApiError> {
    let settlement = state
        .engine
        .mark_sent_manual(&request_id, &user.actor(), body.tx_hash)
        .await?;
    Ok(Json(settlement.into()))
}

/// Reject a request and refund the locked funds.
#[utoipa::path(
    post,
    path = "/v1/admin/withdrawals/{request_id}/reject",
    tag = "Withdrawals",
    params(("request_id" = String, Path, description = "Withdrawal request ID")),
    request_body = RejectWithdrawalRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Request rejected", body = WithdrawalActionResponse),
        (status = 400, description = "Missing reason"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request is already settled or being processed"),
        (status = 429, description = "Rate limited")
    )
)]
pub async fn reject_withdrawal(
    AdminOnly(user): AdminOnly,
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    Json(body): Json<RejectWithdrawalRequest>,
) -> Result<Json<WithdrawalActionResponse>, ApiError> {
    let rejected = state
        .engine
        .reject(&request_id, &user.actor(), &body.reason)?;
    Ok(Json(WithdrawalActionResponse::from(&rejected)))
}
