// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{auth::AdminOnly, error::ApiError, ledger::BalanceRecord, state::AppState};

/// Custody balance of one user for one base token.
#[derive(Debug, Serialize, ToSchema)]
pub struct BalanceResponse {
    pub user_id: String,
    pub base_token_id: String,
    #[schema(value_type = String)]
    pub balance: Decimal,
    /// Reserved by open withdrawal requests.
    #[schema(value_type = String)]
    pub locked_balance: Decimal,
    /// `balance - locked_balance`
    #[schema(value_type = String)]
    pub available: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl From<BalanceRecord> for BalanceResponse {
    fn from(record: BalanceRecord) -> Self {
        Self {
            available: record.available(),
            user_id: record.user_id,
            base_token_id: record.base_token_id,
            balance: record.balance,
            locked_balance: record.locked_balance,
            updated_at: record.updated_at,
        }
    }
}

/// Look up a custody balance. Unknown pairs read as zero.
#[utoipa::path(
    get,
    path = "/v1/admin/balances/{user_id}/{token}",
    tag = "Balances",
    params(
        ("user_id" = String, Path, description = "Balance owner"),
        ("token" = String, Path, description = "Base token ID, e.g. USDT")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Balance record", body = BalanceResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (staff required)")
    )
)]
pub async fn get_balance(
    AdminOnly(user): AdminOnly,
    State(state): State<AppState>,
    Path((user_id, token)): Path<(String, String)>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let record = state.engine.get_balance(&user.actor(), &user_id, &token)?;
    Ok(Json(record.into()))
}
