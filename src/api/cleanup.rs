// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::HeaderMap, Json};
use chrono::Utc;

use crate::{
    config,
    error::ApiError,
    lifecycle::SweepOutcome,
    models::CleanupResponse,
    state::AppState,
};

use super::enforce_rate_limit;

/// Opportunistic sweep. Clients hit this as they poll; at most one real
/// sweep runs per throttle interval and the rest are cheap no-ops.
#[utoipa::path(
    get,
    path = "/v1/cleanup",
    tag = "Cleanup",
    responses((status = 200, body = CleanupResponse))
)]
pub async fn opportunistic_cleanup(
    State(state): State<AppState>,
) -> Result<Json<CleanupResponse>, ApiError> {
    let now = Utc::now();
    let outcome = state.sweeper.opportunistic(&state.db, now).await?;

    let response = match outcome {
        SweepOutcome::Completed(stats) => CleanupResponse {
            performed: true,
            stats: Some(stats),
            timestamp: now,
        },
        SweepOutcome::Skipped => CleanupResponse {
            performed: false,
            stats: None,
            timestamp: now,
        },
    };
    Ok(Json(response))
}

/// Forced sweep, bypassing the throttle. Strictly rate limited instead.
#[utoipa::path(
    post,
    path = "/v1/cleanup/manual",
    tag = "Cleanup",
    responses(
        (status = 200, body = CleanupResponse),
        (status = 429, description = "Rate limit exceeded")
    )
)]
pub async fn manual_cleanup(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CleanupResponse>, ApiError> {
    enforce_rate_limit(&state, &headers, config::MANUAL_CLEANUP_RATE).await?;

    let now = Utc::now();
    let stats = state.sweeper.force(&state.db, now)?;

    Ok(Json(CleanupResponse {
        performed: true,
        stats: Some(stats),
        timestamp: now,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{expiry, identity};
    use crate::models::{CleanupStats, ItemKind, SharedItem};
    use crate::storage::{BlobStore, ShareDb};
    use chrono::Duration;
    use url::Url;
    use uuid::Uuid;

    fn test_state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = ShareDb::open(&dir.path().join("share.redb")).unwrap();
        let blobs = BlobStore::new(dir.path(), Url::parse("http://example.test").unwrap());
        blobs.initialize().unwrap();
        (AppState::new(db, blobs), dir)
    }

    fn expired_item() -> SharedItem {
        let created_at = Utc::now() - Duration::hours(25);
        SharedItem {
            id: Uuid::new_v4().to_string(),
            kind: ItemKind::Text,
            content: "stale".into(),
            file_name: None,
            file_size: None,
            mime_type: None,
            network_id: identity::network_id_for("10.0.0.5"),
            created_at,
            expires_at: expiry::item_expiry(created_at),
            download_count: 0,
        }
    }

    #[tokio::test]
    async fn manual_cleanup_reports_deletions_and_converges() {
        let (state, _dir) = test_state();
        state.db.insert_item(&expired_item()).unwrap();

        let Json(first) = manual_cleanup(State(state.clone()), HeaderMap::new())
            .await
            .expect("cleanup succeeds");
        assert!(first.performed);
        assert_eq!(
            first.stats.unwrap(),
            CleanupStats {
                expired_items: 1,
                stale_sessions: 0,
                very_old_items: 0
            }
        );

        // Immediately repeating deletes nothing further.
        let Json(second) = manual_cleanup(State(state), HeaderMap::new())
            .await
            .expect("cleanup succeeds");
        assert_eq!(second.stats.unwrap(), CleanupStats::default());
    }

    #[tokio::test]
    async fn opportunistic_cleanup_is_throttled() {
        let (state, _dir) = test_state();
        state.db.insert_item(&expired_item()).unwrap();

        let Json(first) = opportunistic_cleanup(State(state.clone())).await.unwrap();
        assert!(first.performed);
        assert_eq!(first.stats.unwrap().expired_items, 1);

        let Json(second) = opportunistic_cleanup(State(state)).await.unwrap();
        assert!(!second.performed);
        assert!(second.stats.is_none());
    }

    #[tokio::test]
    async fn manual_cleanup_is_strictly_rate_limited() {
        let (state, _dir) = test_state();

        for _ in 0..2 {
            manual_cleanup(State(state.clone()), HeaderMap::new())
                .await
                .expect("within rate limit");
        }

        let denied = manual_cleanup(State(state), HeaderMap::new())
            .await
            .unwrap_err();
        assert_eq!(denied.status, axum::http::StatusCode::TOO_MANY_REQUESTS);
    }
}
