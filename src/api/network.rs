// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::HeaderMap, Json};
use chrono::Utc;

use crate::{
    config,
    error::ApiError,
    lifecycle::identity,
    models::NetworkInfo,
    state::AppState,
};

use super::enforce_rate_limit;

/// Resolve the caller's network identity and record presence.
///
/// Clients call this first (and then poll it) to learn which network they
/// share with and how many peers are currently around.
#[utoipa::path(
    get,
    path = "/v1/network",
    tag = "Network",
    responses(
        (status = 200, body = NetworkInfo),
        (status = 429, description = "Rate limit exceeded")
    )
)]
pub async fn network_info(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<NetworkInfo>, ApiError> {
    enforce_rate_limit(&state, &headers, config::DEFAULT_RATE).await?;

    let client_address = identity::client_address(&headers);
    let user_agent = identity::user_agent(&headers);
    let now = Utc::now();

    let presence = identity::resolve(&state.db, client_address, user_agent, now)?;

    Ok(Json(NetworkInfo {
        network_id: presence.network_id,
        connected_users: presence.connected_users,
        client_address: presence.client_address,
        timestamp: now,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{BlobStore, ShareDb};
    use axum::http::HeaderValue;
    use url::Url;

    fn test_state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = ShareDb::open(&dir.path().join("share.redb")).unwrap();
        let blobs = BlobStore::new(dir.path(), Url::parse("http://example.test").unwrap());
        blobs.initialize().unwrap();
        (AppState::new(db, blobs), dir)
    }

    fn headers_for(ip: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_str(ip).unwrap());
        headers
    }

    #[tokio::test]
    async fn resolves_identity_and_counts_peers() {
        let (state, _dir) = test_state();

        let Json(first) = network_info(State(state.clone()), headers_for("10.0.0.5"))
            .await
            .expect("resolution succeeds");
        assert_eq!(first.connected_users, 1);
        assert_eq!(first.client_address, "10.0.0.5");

        // A second peer on the same /24 sees both sessions.
        let Json(second) = network_info(State(state.clone()), headers_for("10.0.0.200"))
            .await
            .expect("resolution succeeds");
        assert_eq!(second.network_id, first.network_id);
        assert_eq!(second.connected_users, 2);

        // A different subnet resolves to a different network with its own count.
        let Json(other) = network_info(State(state), headers_for("10.0.1.5"))
            .await
            .expect("resolution succeeds");
        assert_ne!(other.network_id, first.network_id);
        assert_eq!(other.connected_users, 1);
    }

    #[tokio::test]
    async fn repeat_resolution_is_stable_and_not_double_counted() {
        let (state, _dir) = test_state();

        let Json(first) = network_info(State(state.clone()), headers_for("192.168.7.3"))
            .await
            .unwrap();
        let Json(second) = network_info(State(state), headers_for("192.168.7.3"))
            .await
            .unwrap();

        assert_eq!(first.network_id, second.network_id);
        assert_eq!(second.connected_users, 1);
    }
}
