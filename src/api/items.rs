// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::warn;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    config,
    error::ApiError,
    lifecycle::{expiry, quota, QuotaDecision},
    models::{ItemKind, ShareTextRequest, SharedItem, TrackDownloadResponse},
    state::AppState,
    validation,
};

use super::{enforce_rate_limit, parse_network_id};

#[derive(Deserialize, IntoParams)]
pub struct NetworkQuery {
    pub network_id: String,
}

/// Live items for a network, newest first.
#[utoipa::path(
    get,
    path = "/v1/items",
    params(NetworkQuery),
    tag = "Items",
    responses(
        (status = 200, body = [SharedItem]),
        (status = 400, description = "Invalid network ID")
    )
)]
pub async fn list_items(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<NetworkQuery>,
) -> Result<Json<Vec<SharedItem>>, ApiError> {
    enforce_rate_limit(&state, &headers, config::DEFAULT_RATE).await?;
    let network_id = parse_network_id(&params.network_id)?;

    let items = state
        .db
        .list_network_items(&network_id, Utc::now(), config::LIST_LIMIT)?;
    Ok(Json(items))
}

/// Share a text snippet with the caller's network.
#[utoipa::path(
    post,
    path = "/v1/items",
    request_body = ShareTextRequest,
    tag = "Items",
    responses(
        (status = 201, body = SharedItem),
        (status = 400, description = "Invalid input"),
        (status = 413, description = "Network item limit reached"),
        (status = 429, description = "Rate limit exceeded")
    )
)]
pub async fn share_text(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ShareTextRequest>,
) -> Result<(StatusCode, Json<SharedItem>), ApiError> {
    enforce_rate_limit(&state, &headers, config::SHARE_RATE).await?;
    let network_id = parse_network_id(&request.network_id)?;

    let content = validation::sanitize_text(&request.content);
    if content.is_empty() {
        return Err(ApiError::bad_request("Content required"));
    }
    if content.chars().count() > config::MAX_TEXT_LENGTH {
        return Err(ApiError::bad_request(format!(
            "Text content too long (max {} characters)",
            config::MAX_TEXT_LENGTH
        )));
    }

    let now = Utc::now();
    if let QuotaDecision::Exceeded { current_count, .. } =
        quota::check_admission(&state.db, &network_id, 0, now)?
    {
        return Err(ApiError::payload_too_large(format!(
            "Network item limit reached ({current_count} of {} items in use)",
            config::MAX_ITEMS_PER_NETWORK
        )));
    }

    let item = SharedItem {
        id: Uuid::new_v4().to_string(),
        kind: ItemKind::Text,
        content,
        file_name: None,
        file_size: None,
        mime_type: None,
        network_id,
        created_at: now,
        expires_at: expiry::item_expiry(now),
        download_count: 0,
    };
    state.db.insert_item(&item)?;

    Ok((StatusCode::CREATED, Json(item)))
}

/// Delete a shared item. Any peer on the LAN may delete; the item is gone
/// for everyone.
#[utoipa::path(
    delete,
    path = "/v1/items/{item_id}",
    params(
        ("item_id" = String, Path, description = "Identifier of the item to delete")
    ),
    tag = "Items",
    responses(
        (status = 204),
        (status = 404, description = "Item not found")
    )
)]
pub async fn delete_item(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    enforce_rate_limit(&state, &headers, config::DEFAULT_RATE).await?;
    validation::validate_item_id(&item_id)?;

    let existing = state.db.get_item(&item_id)?;
    if !state.db.delete_item(&item_id)? {
        return Err(ApiError::not_found("Item not found"));
    }

    // Reclaim the payload alongside the record; the record is already gone,
    // so a blob failure only leaves an orphan file behind.
    if let Some(item) = existing {
        if item.kind == ItemKind::File {
            if let Some(key) = state.blobs.key_from_url(&item.content) {
                if let Err(e) = state.blobs.delete(&key) {
                    warn!(item_id = %item_id, error = %e, "failed to delete blob for removed item");
                }
            }
        }
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Record a download of a live item.
#[utoipa::path(
    post,
    path = "/v1/items/{item_id}/download",
    params(
        ("item_id" = String, Path, description = "Identifier of the downloaded item")
    ),
    tag = "Items",
    responses(
        (status = 200, body = TrackDownloadResponse),
        (status = 404, description = "Item not found or expired")
    )
)]
pub async fn track_download(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<TrackDownloadResponse>, ApiError> {
    enforce_rate_limit(&state, &headers, config::DEFAULT_RATE).await?;
    validation::validate_item_id(&item_id)?;

    match state.db.increment_download(&item_id, Utc::now())? {
        Some(download_count) => Ok(Json(TrackDownloadResponse { download_count })),
        None => Err(ApiError::not_found("Item not found or expired")),
    }
}
