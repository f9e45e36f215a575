// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{Action, Role},
    error::ErrorBody,
    ledger::BalanceRecord,
    state::AppState,
    storage::audit::{AuditEvent, AuditEventType},
    withdrawal::{
        ProcessingType, Transaction, TransactionKind, TransactionMetadata, TransactionStatus,
        WithdrawalRequest, WithdrawalStatus,
    },
};

pub mod audit;
pub mod balances;
pub mod health;
pub mod withdrawals;

pub fn router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/withdrawals", get(withdrawals::list_withdrawals))
        .route("/withdrawals/{request_id}", get(withdrawals::get_withdrawal))
        .route(
            "/withdrawals/{request_id}/approve",
            post(withdrawals::approve_withdrawal),
        )
        .route(
            "/withdrawals/{request_id}/process",
            post(withdrawals::process_withdrawal),
        )
        .route(
            "/withdrawals/{request_id}/mark-sent",
            post(withdrawals::mark_withdrawal_sent),
        )
        .route(
            "/withdrawals/{request_id}/reject",
            post(withdrawals::reject_withdrawal),
        )
        .route("/balances/{user_id}/{token}", get(balances::get_balance))
        .route("/audit/events", get(audit::query_audit_events));

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .nest("/v1/admin", admin_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        withdrawals::list_withdrawals,
        withdrawals::get_withdrawal,
        withdrawals::approve_withdrawal,
        withdrawals::process_withdrawal,
        withdrawals::mark_withdrawal_sent,
        withdrawals::reject_withdrawal,
        balances::get_balance,
        audit::query_audit_events
    ),
    components(
        schemas(
            ErrorBody,
            Role,
            Action,
            BalanceRecord,
            WithdrawalRequest,
            WithdrawalStatus,
            ProcessingType,
            Transaction,
            TransactionKind,
            TransactionStatus,
            TransactionMetadata,
            AuditEvent,
            AuditEventType,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse,
            withdrawals::WithdrawalListResponse,
            withdrawals::WithdrawalDetailResponse,
            withdrawals::ProcessWithdrawalRequest,
            withdrawals::MarkSentRequest,
            withdrawals::RejectWithdrawalRequest,
            withdrawals::WithdrawalActionResponse,
            balances::BalanceResponse,
            audit::AuditLogResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness"),
        (name = "Withdrawals", description = "Two-tier withdrawal approval"),
        (name = "Balances", description = "Custody balance lookup"),
        (name = "Audit", description = "Audit trail of privileged actions")
    )
)]
struct ApiDoc;
