// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;

use crate::{
    config,
    error::ApiError,
    lifecycle::expiry,
    models::{ItemKind, SharedItem},
    state::AppState,
    validation,
};

use super::enforce_rate_limit;

/// Fetch a live file item, or a NotFoundOrExpired-style 404.
fn live_file_item(state: &AppState, item_id: &str) -> Result<SharedItem, ApiError> {
    validation::validate_item_id(item_id)?;

    let item = state
        .db
        .get_item(item_id)?
        .filter(|item| expiry::item_is_live(item.expires_at, Utc::now()))
        .filter(|item| item.kind == ItemKind::File)
        .ok_or_else(|| ApiError::not_found("File not found or expired"))?;

    Ok(item)
}

/// Redirect to the blob URL for a live file item.
#[utoipa::path(
    get,
    path = "/v1/download/{item_id}",
    params(
        ("item_id" = String, Path, description = "Identifier of the file item")
    ),
    tag = "Files",
    responses(
        (status = 307, description = "Redirect to the blob URL"),
        (status = 404, description = "File not found or expired")
    )
)]
pub async fn download_file(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    headers: HeaderMap,
) -> Result<Redirect, ApiError> {
    enforce_rate_limit(&state, &headers, config::DEFAULT_RATE).await?;
    let item = live_file_item(&state, &item_id)?;
    Ok(Redirect::temporary(&item.content))
}

/// Redirect to the blob URL for a live image item. Non-image file kinds
/// get a 400, matching what the client's inline preview can render.
#[utoipa::path(
    get,
    path = "/v1/preview/{item_id}",
    params(
        ("item_id" = String, Path, description = "Identifier of the file item")
    ),
    tag = "Files",
    responses(
        (status = 307, description = "Redirect to the blob URL"),
        (status = 400, description = "Preview not available for this file type"),
        (status = 404, description = "File not found or expired")
    )
)]
pub async fn preview_file(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    headers: HeaderMap,
) -> Result<Redirect, ApiError> {
    enforce_rate_limit(&state, &headers, config::DEFAULT_RATE).await?;
    let item = live_file_item(&state, &item_id)?;

    let is_image = item
        .mime_type
        .as_deref()
        .is_some_and(|mime| mime.starts_with("image/"));
    if !is_image {
        return Err(ApiError::bad_request(
            "Preview not available for this file type",
        ));
    }

    Ok(Redirect::temporary(&item.content))
}

/// Serve stored blob bytes with their recorded content type. This is the
/// target the download/preview redirects point at.
pub async fn serve_blob(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    let (bytes, content_type) = state.blobs.open(&key)?;
    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}
