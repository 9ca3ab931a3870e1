// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! This module defines the records stored in the database and the request
//! and response structures used by the REST API. All types derive
//! `Serialize`, `Deserialize`, and `ToSchema` for automatic JSON handling
//! and OpenAPI documentation.
//!
//! ## Network Identity Type
//!
//! The [`NetworkId`] newtype wraps the SHA-256 subnet fingerprint (64
//! lowercase hex characters) that groups clients presumed to be on the same
//! LAN. It provides type safety and validates on parse.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// =============================================================================
// Network Identity Type
// =============================================================================

/// Opaque network identity grouping clients on the same subnet.
///
/// Format: 64 lowercase hexadecimal characters (a SHA-256 digest of the
/// normalized subnet string).
///
/// # Example
///
/// ```rust,ignore
/// let id = NetworkId::parse("ab…64 hex chars…").unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct NetworkId(String);

impl NetworkId {
    /// Validate and wrap an inbound network identity string.
    ///
    /// Returns `None` unless the value is exactly 64 lowercase hex chars.
    pub fn parse(value: &str) -> Option<Self> {
        let valid = value.len() == 64
            && value
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        valid.then(|| Self(value.to_string()))
    }

    /// Wrap a digest the server itself derived. The caller guarantees the
    /// value is a lowercase hex SHA-256 string.
    pub(crate) fn from_digest(digest: String) -> Self {
        Self(digest)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NetworkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Shared Items
// =============================================================================

/// What kind of payload a shared item carries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// Inline text snippet; the payload is the `content` string itself.
    Text,
    /// Uploaded file; `content` holds the blob reference URL.
    File,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Text => "text",
            ItemKind::File => "file",
        }
    }
}

/// A shared item visible to everyone on the owning network.
///
/// Items are live until `expires_at`; expired items are filtered on every
/// read path and eventually deleted by the sweeper.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct SharedItem {
    /// Unique identifier (UUID v4).
    pub id: String,
    /// Payload kind.
    pub kind: ItemKind,
    /// Text body for text items; blob reference URL for file items.
    pub content: String,
    /// Original file name (file items only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Payload size in bytes (file items only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    /// Declared content type (file items only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// The network this item belongs to.
    pub network_id: NetworkId,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Instant after which the item is logically gone.
    pub expires_at: DateTime<Utc>,
    /// Times the item has been fetched. Informational only.
    pub download_count: u64,
}

/// Request to share a text snippet.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ShareTextRequest {
    /// The caller's network identity (from `GET /v1/network`).
    pub network_id: String,
    /// The snippet to share. Sanitized and bounded server-side.
    pub content: String,
}

/// Response to a successful file upload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadReceipt {
    /// Identifier of the created item.
    pub item_id: String,
    /// Aggregate live bytes stored for the network after this upload.
    pub storage_used: u64,
    /// Live item count for the network after this upload.
    pub item_count: u64,
}

/// Response to a download-count tracking call.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TrackDownloadResponse {
    /// Counter value after this download.
    pub download_count: u64,
}

// =============================================================================
// Sessions
// =============================================================================

/// Ephemeral presence record, not a user account.
///
/// Upserted on every identity resolution; active while `last_seen` is
/// within the 5-minute window, deleted by the sweeper afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Session {
    /// The network this session belongs to.
    pub network_id: NetworkId,
    /// Apparent client address the session was observed from.
    pub client_address: String,
    /// User agent reported on the last resolution.
    pub user_agent: String,
    /// Instant of last observed activity.
    pub last_seen: DateTime<Utc>,
}

/// Response to a network identity resolution.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NetworkInfo {
    /// The caller's derived network identity.
    pub network_id: NetworkId,
    /// Sessions active on this network within the last 5 minutes.
    pub connected_users: u64,
    /// The apparent address the identity was derived from.
    pub client_address: String,
    /// Server-side resolution instant.
    pub timestamp: DateTime<Utc>,
}

// =============================================================================
// Stats & Cleanup
// =============================================================================

/// Aggregate statistics for a network, over live records only.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ShareStats {
    /// Live item count.
    pub total_shares: u64,
    /// Sum of download counters across live items.
    pub total_downloads: u64,
    /// Aggregate live file bytes.
    pub storage_used: u64,
    /// Sessions active within the last 5 minutes.
    pub active_users: u64,
}

/// Per-category deletion counts from one sweep.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct CleanupStats {
    /// Items deleted because their expiry instant passed.
    pub expired_items: u64,
    /// Sessions deleted because they fell outside the active window.
    pub stale_sessions: u64,
    /// Items deleted by the 48-hour absolute-age backstop.
    pub very_old_items: u64,
}

/// Response to a cleanup request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CleanupResponse {
    /// Whether a real sweep ran. `false` means the throttle interval had
    /// not yet elapsed and nothing was done.
    pub performed: bool,
    /// Deletion counts when a sweep ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<CleanupStats>,
    /// Server-side completion instant.
    pub timestamp: DateTime<Utc>,
}
