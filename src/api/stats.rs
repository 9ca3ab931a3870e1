// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;

use crate::{
    config,
    error::ApiError,
    lifecycle::expiry,
    models::ShareStats,
    state::AppState,
};

use super::{enforce_rate_limit, items::NetworkQuery, parse_network_id};

/// Aggregate statistics for a network, over live records only.
#[utoipa::path(
    get,
    path = "/v1/stats",
    params(NetworkQuery),
    tag = "Stats",
    responses(
        (status = 200, body = ShareStats),
        (status = 400, description = "Invalid network ID")
    )
)]
pub async fn share_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<NetworkQuery>,
) -> Result<Json<ShareStats>, ApiError> {
    enforce_rate_limit(&state, &headers, config::DEFAULT_RATE).await?;
    let network_id = parse_network_id(&params.network_id)?;

    let now = Utc::now();
    let totals = state.db.network_aggregates(&network_id, now)?;
    let active_users = state
        .db
        .count_active_sessions(&network_id, expiry::session_cutoff(now))?;

    Ok(Json(ShareStats {
        total_shares: totals.live_items,
        total_downloads: totals.download_total,
        storage_used: totals.stored_bytes,
        active_users,
    }))
}
