// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::AdminOnly,
    error::ApiError,
    state::AppState,
    storage::audit::{AuditEvent, AuditEventType, AuditQuery},
};

const DEFAULT_PAGE_SIZE: usize = 100;
const MAX_PAGE_SIZE: usize = 1000;

/// Query parameters for audit log queries.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct AuditQueryParams {
    /// Start date (`YYYY-MM-DD` or RFC 3339), inclusive.
    pub start_date: Option<String>,
    /// End date (`YYYY-MM-DD` or RFC 3339), inclusive.
    pub end_date: Option<String>,
    /// Filter by acting user ID.
    pub actor_id: Option<String>,
    /// Filter by event type, e.g. `withdrawal_rejected`.
    pub action: Option<String>,
    /// Filter by withdrawal request ID.
    pub resource_id: Option<String>,
    /// Maximum number of results (default 100, max 1000).
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuditLogResponse {
    pub events: Vec<AuditEvent>,
    /// Total count (before limit/offset).
    pub total: usize,
    pub has_more: bool,
}

/// Query the audit trail.
#[utoipa::path(
    get,
    path = "/v1/admin/audit/events",
    tag = "Audit",
    params(AuditQueryParams),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Audit events", body = AuditLogResponse),
        (status = 400, description = "Invalid query parameters"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (staff required)")
    )
)]
pub async fn query_audit_events(
    AdminOnly(user): AdminOnly,
    State(state): State<AppState>,
    Query(params): Query<AuditQueryParams>,
) -> Result<Json<AuditLogResponse>, ApiError> {
    let offset = params.offset.unwrap_or(0);
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let query = build_query(params)?;

    let matching = state.engine.audit_events(&user.actor(), &query)?;
    let total = matching.len();
    let events: Vec<AuditEvent> = matching.into_iter().skip(offset).take(limit).collect();
    let has_more = offset + events.len() < total;

    Ok(Json(AuditLogResponse {
        events,
        total,
        has_more,
    }))
}

/// Filters only; paging is applied after counting.
fn build_query(params: AuditQueryParams) -> Result<AuditQuery, ApiError> {
    let start = params
        .start_date
        .as_deref()
        .map(|raw| parse_bound(raw, "start_date", false))
        .transpose()?;
    let end = params
        .end_date
        .as_deref()
        .map(|raw| parse_bound(raw, "end_date", true))
        .transpose()?;
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(ApiError::bad_request("start_date is after end_date"));
        }
    }

    let event_type = params
        .action
        .as_deref()
        .map(|raw| {
            AuditEventType::from_str(raw)
                .ok_or_else(|| ApiError::bad_request(format!("unknown action: {raw}")))
        })
        .transpose()?;

    Ok(AuditQuery {
        start,
        end,
        actor_id: params.actor_id,
        event_type,
        resource_id: params.resource_id,
        offset: 0,
        limit: 0,
    })
}

/// A bare date covers the whole UTC day.
fn parse_bound(raw: &str, field: &str, end_of_day: bool) -> Result<DateTime<Utc>, ApiError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        ApiError::bad_request(format!("Invalid {field} format. Use YYYY-MM-DD or RFC 3339."))
    })?;
    let midnight = date.and_time(chrono::NaiveTime::MIN).and_utc();
    Ok(if end_of_day {
        midnight + Duration::days(1) - Duration::nanoseconds(1)
    } else {
        midnight
    })
}
