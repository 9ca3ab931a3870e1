// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Multipart, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::{
    config,
    error::ApiError,
    lifecycle::{expiry, quota, QuotaDecision},
    models::{ItemKind, SharedItem, UploadReceipt},
    state::AppState,
    validation,
};

use super::{enforce_rate_limit, parse_network_id};

/// Upload a file to the caller's network.
///
/// Multipart form with a `file` part and a `network_id` field. The payload
/// lands in the blob store; the item records only the reference URL.
#[utoipa::path(
    post,
    path = "/v1/upload",
    tag = "Files",
    responses(
        (status = 201, body = UploadReceipt),
        (status = 400, description = "Missing or invalid file"),
        (status = 413, description = "Network quota exceeded"),
        (status = 429, description = "Rate limit exceeded")
    )
)]
pub async fn upload_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadReceipt>), ApiError> {
    enforce_rate_limit(&state, &headers, config::UPLOAD_RATE).await?;

    let mut file_bytes = None;
    let mut file_name = None;
    let mut content_type = None;
    let mut network_id_raw = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed multipart body: {e}")))?
    {
        match field.name() {
            Some("file") => {
                file_name = field.file_name().map(str::to_string);
                content_type = field.content_type().map(str::to_string);
                file_bytes = Some(field.bytes().await.map_err(|e| {
                    ApiError::bad_request(format!("Failed to read file part: {e}"))
                })?);
            }
            Some("network_id") => {
                network_id_raw = Some(field.text().await.map_err(|e| {
                    ApiError::bad_request(format!("Failed to read network_id field: {e}"))
                })?);
            }
            _ => {}
        }
    }

    let bytes = file_bytes.ok_or_else(|| ApiError::bad_request("File is required"))?;
    let network_id = parse_network_id(network_id_raw.as_deref().unwrap_or_default())?;
    let file_name = file_name.ok_or_else(|| ApiError::bad_request("File name is required"))?;
    let content_type = content_type.unwrap_or_else(|| "application/octet-stream".to_string());

    validation::validate_file(&file_name, bytes.len() as u64, &content_type)?;

    let now = Utc::now();
    let usage = match quota::check_admission(&state.db, &network_id, bytes.len() as u64, now)? {
        QuotaDecision::Admitted(usage) => usage,
        QuotaDecision::Exceeded {
            current_count,
            current_bytes,
        } => {
            return Err(ApiError::payload_too_large(format!(
                "Network storage limit would be exceeded. Current: {}MB of {}MB, {current_count} of {} items",
                current_bytes / 1024 / 1024,
                config::MAX_NETWORK_STORAGE / 1024 / 1024,
                config::MAX_ITEMS_PER_NETWORK
            )));
        }
    };

    let blob = state
        .blobs
        .put(&network_id, &file_name, &content_type, &bytes, now)?;

    let item = SharedItem {
        id: Uuid::new_v4().to_string(),
        kind: ItemKind::File,
        content: blob.url,
        file_name: Some(file_name),
        file_size: Some(bytes.len() as u64),
        mime_type: Some(content_type),
        network_id,
        created_at: now,
        expires_at: expiry::item_expiry(now),
        download_count: 0,
    };
    state.db.insert_item(&item)?;

    info!(
        item_id = %item.id,
        size = bytes.len(),
        "file uploaded"
    );

    Ok((
        StatusCode::CREATED,
        Json(UploadReceipt {
            item_id: item.id,
            storage_used: usage.stored_bytes + bytes.len() as u64,
            item_count: usage.live_items + 1,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::identity;
    use crate::models::NetworkId;
    use crate::storage::{BlobStore, ShareDb};
    use axum::extract::FromRequest;
    use axum::http::Request;
    use url::Url;

    fn test_state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = ShareDb::open(&dir.path().join("share.redb")).unwrap();
        let blobs = BlobStore::new(dir.path(), Url::parse("http://example.test").unwrap());
        blobs.initialize().unwrap();
        (AppState::new(db, blobs), dir)
    }

    fn net() -> NetworkId {
        identity::network_id_for("10.0.0.5")
    }

    /// Build a Multipart extractor from a hand-rolled form body.
    async fn multipart_with(
        network_id: &str,
        file_name: &str,
        content_type: &str,
        payload: &[u8],
    ) -> Multipart {
        let boundary = "test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\ncontent-disposition: form-data; name=\"network_id\"\r\n\r\n{network_id}\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(
            format!(
                "--{boundary}\r\ncontent-disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\ncontent-type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(payload);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(axum::body::Body::from(body))
            .unwrap();

        Multipart::from_request(request, &()).await.unwrap()
    }

    #[tokio::test]
    async fn upload_stores_blob_and_item() {
        let (state, _dir) = test_state();
        let multipart =
            multipart_with(net().as_str(), "notes.txt", "text/plain", b"hello lan").await;

        let (status, Json(receipt)) =
            upload_file(State(state.clone()), HeaderMap::new(), multipart)
                .await
                .expect("upload succeeds");

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(receipt.storage_used, 9);
        assert_eq!(receipt.item_count, 1);

        let item = state.db.get_item(&receipt.item_id).unwrap().unwrap();
        assert_eq!(item.kind, ItemKind::File);
        assert_eq!(item.file_size, Some(9));
        assert_eq!(item.mime_type.as_deref(), Some("text/plain"));

        // The stored reference resolves back to the payload.
        let key = state.blobs.key_from_url(&item.content).unwrap();
        let (bytes, served_type) = state.blobs.open(&key).unwrap();
        assert_eq!(bytes, b"hello lan");
        assert_eq!(served_type, "text/plain");
    }

    #[tokio::test]
    async fn upload_rejects_disallowed_type() {
        let (state, _dir) = test_state();
        let multipart = multipart_with(
            net().as_str(),
            "tool.exe",
            "application/x-msdownload",
            b"MZ",
        )
        .await;

        let err = upload_file(State(state), HeaderMap::new(), multipart)
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("not allowed"));
    }

    #[tokio::test]
    async fn upload_rejects_when_byte_quota_would_be_exceeded() {
        let (state, _dir) = test_state();
        let now = Utc::now();

        // A network already holding MAX_NETWORK_STORAGE - 1 live bytes
        // cannot take even a 2-byte file.
        state
            .db
            .insert_item(&SharedItem {
                id: Uuid::new_v4().to_string(),
                kind: ItemKind::File,
                content: "http://example.test/v1/blobs/big".into(),
                file_name: Some("big.bin".into()),
                file_size: Some(config::MAX_NETWORK_STORAGE - 1),
                mime_type: Some("application/pdf".into()),
                network_id: net(),
                created_at: now,
                expires_at: expiry::item_expiry(now),
                download_count: 0,
            })
            .unwrap();

        let multipart = multipart_with(net().as_str(), "tiny.txt", "text/plain", b"ab").await;
        let err = upload_file(State(state), HeaderMap::new(), multipart)
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn upload_requires_file_and_valid_network() {
        let (state, _dir) = test_state();

        let bad_network = multipart_with("not-hex", "a.txt", "text/plain", b"x").await;
        let err = upload_file(State(state.clone()), HeaderMap::new(), bad_network)
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        // A form with no file part at all.
        let boundary = "empty-boundary";
        let body = format!(
            "--{boundary}\r\ncontent-disposition: form-data; name=\"network_id\"\r\n\r\n{}\r\n--{boundary}--\r\n",
            net().as_str()
        );
        let request = Request::builder()
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(axum::body::Body::from(body))
            .unwrap();
        let no_file = Multipart::from_request(request, &()).await.unwrap();

        let err = upload_file(State(state), HeaderMap::new(), no_file)
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("File is required"));
    }
}
