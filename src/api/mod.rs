// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderMap,
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::MAX_FILE_SIZE,
    error::ApiError,
    lifecycle::{identity, RateDecision, RatePolicy},
    models::{
        CleanupResponse, CleanupStats, ItemKind, NetworkId, NetworkInfo, ShareStats,
        ShareTextRequest, SharedItem, TrackDownloadResponse, UploadReceipt,
    },
    state::AppState,
};

pub mod cleanup;
pub mod download;
pub mod health;
pub mod items;
pub mod network;
pub mod stats;
pub mod upload;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/network", get(network::network_info))
        .route("/items", get(items::list_items).post(items::share_text))
        .route("/items/{item_id}", delete(items::delete_item))
        .route("/items/{item_id}/download", post(items::track_download))
        .route("/upload", post(upload::upload_file))
        .route("/download/{item_id}", get(download::download_file))
        .route("/preview/{item_id}", get(download::preview_file))
        .route("/blobs/{*key}", get(download::serve_blob))
        .route("/stats", get(stats::share_stats))
        .route("/cleanup", get(cleanup::opportunistic_cleanup))
        .route("/cleanup/manual", post(cleanup::manual_cleanup))
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        // Leave headroom above the file-size ceiling for multipart framing.
        .layer(DefaultBodyLimit::max((MAX_FILE_SIZE + 1024 * 1024) as usize))
}

/// Check the caller against a per-endpoint rate policy before doing work.
pub(crate) async fn enforce_rate_limit(
    state: &AppState,
    headers: &HeaderMap,
    policy: RatePolicy,
) -> Result<(), ApiError> {
    let caller = identity::client_address(headers);
    match state.limiter.allow(&caller, policy).await {
        RateDecision::Admitted { .. } => Ok(()),
        RateDecision::Limited { reset_at } => Err(ApiError::too_many_requests(format!(
            "Too many requests. Retry after {}",
            reset_at.to_rfc3339()
        ))),
    }
}

/// Parse and validate an inbound network identity string.
pub(crate) fn parse_network_id(raw: &str) -> Result<NetworkId, ApiError> {
    NetworkId::parse(raw).ok_or_else(|| ApiError::bad_request("Valid network ID required"))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        network::network_info,
        items::list_items,
        items::share_text,
        items::delete_item,
        items::track_download,
        upload::upload_file,
        download::download_file,
        download::preview_file,
        stats::share_stats,
        cleanup::opportunistic_cleanup,
        cleanup::manual_cleanup,
        health::health,
        health::liveness
    ),
    components(
        schemas(
            NetworkId,
            NetworkInfo,
            ItemKind,
            SharedItem,
            ShareTextRequest,
            TrackDownloadResponse,
            UploadReceipt,
            ShareStats,
            CleanupStats,
            CleanupResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Network", description = "Network identity and presence"),
        (name = "Items", description = "Shared text and file items"),
        (name = "Files", description = "Upload, download, and preview"),
        (name = "Stats", description = "Per-network statistics"),
        (name = "Cleanup", description = "Expired record reclamation"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{BlobStore, ShareDb};
    use url::Url;

    fn test_state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = ShareDb::open(&dir.path().join("share.redb")).unwrap();
        let blobs = BlobStore::new(dir.path(), Url::parse("http://example.test").unwrap());
        blobs.initialize().unwrap();
        (AppState::new(db, blobs), dir)
    }

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let (state, _dir) = test_state();
        let app = router(state);
        // Ensure the router can be converted into a service without panicking.
        let _ = app.into_make_service();
    }

    #[tokio::test]
    async fn rate_limit_helper_denies_after_ceiling() {
        let (state, _dir) = test_state();
        let headers = HeaderMap::new();
        let policy = RatePolicy {
            max_requests: 2,
            window_ms: 60_000,
        };

        assert!(enforce_rate_limit(&state, &headers, policy).await.is_ok());
        assert!(enforce_rate_limit(&state, &headers, policy).await.is_ok());
        let denied = enforce_rate_limit(&state, &headers, policy).await.unwrap_err();
        assert_eq!(denied.status, axum::http::StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn parse_network_id_rejects_invalid_values() {
        assert!(parse_network_id(&"a".repeat(64)).is_ok());
        let err = parse_network_id("nope").unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
    }
}
