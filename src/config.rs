// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration Constants
//!
//! This module defines environment variable names, default values, and the
//! lifecycle limit constants used throughout the application. Configuration
//! is loaded from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Root directory for the database and blob files | `./data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `PUBLIC_BASE_URL` | Base URL used to build blob reference URLs | `http://HOST:PORT` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use crate::lifecycle::rate_limit::RatePolicy;

/// Environment variable name for the data directory path.
///
/// The database file and uploaded blobs live under this directory.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Environment variable name for the server bind address.
pub const HOST_ENV: &str = "HOST";

/// Environment variable name for the server bind port.
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the public base URL.
///
/// Blob reference URLs stored on file items are built by joining the blob
/// key onto this base, so it must be reachable by LAN peers (e.g.
/// `http://192.168.1.10:8080`).
pub const PUBLIC_BASE_URL_ENV: &str = "PUBLIC_BASE_URL";

/// Environment variable name for the log output format.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Default data directory when `DATA_DIR` is unset.
pub const DEFAULT_DATA_DIR: &str = "./data";

// =============================================================================
// Item Limits
// =============================================================================

/// Maximum length of a shared text snippet, in characters.
pub const MAX_TEXT_LENGTH: usize = 5000;

/// Maximum number of live items per network identity.
pub const MAX_ITEMS_PER_NETWORK: u64 = 25;

/// Maximum aggregate stored bytes of live file items per network identity.
pub const MAX_NETWORK_STORAGE: u64 = 50 * 1024 * 1024;

/// Maximum size of a single uploaded file, in bytes.
pub const MAX_FILE_SIZE: u64 = 4 * 1024 * 1024;

/// MIME types accepted for file uploads.
pub const ALLOWED_MIME_TYPES: [&str; 6] = [
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "text/plain",
    "application/pdf",
];

/// Maximum number of items returned by a listing request.
pub const LIST_LIMIT: usize = 50;

// =============================================================================
// Lifecycle Windows
// =============================================================================

/// Hours a shared item stays live after creation.
pub const ITEM_TTL_HOURS: i64 = 24;

/// Absolute age ceiling for items, in hours. Items older than this are
/// deleted by the sweeper regardless of their recorded expiry instant.
pub const VERY_OLD_ITEM_HOURS: i64 = 48;

/// Seconds after which a session without activity stops counting as active.
/// Stale sessions past this window are also the ones the sweeper deletes.
pub const SESSION_ACTIVE_WINDOW_SECS: i64 = 5 * 60;

/// Minimum seconds between two real opportunistic sweeps.
pub const SWEEP_MIN_INTERVAL_SECS: i64 = 5 * 60;

// =============================================================================
// Rate Limit Policies (per endpoint class)
// =============================================================================

/// Default policy for read-style endpoints.
pub const DEFAULT_RATE: RatePolicy = RatePolicy {
    max_requests: 30,
    window_ms: 60_000,
};

/// Policy for sharing text snippets.
pub const SHARE_RATE: RatePolicy = RatePolicy {
    max_requests: 5,
    window_ms: 60_000,
};

/// Policy for file uploads.
pub const UPLOAD_RATE: RatePolicy = RatePolicy {
    max_requests: 3,
    window_ms: 60_000,
};

/// Policy for manually triggered cleanup.
pub const MANUAL_CLEANUP_RATE: RatePolicy = RatePolicy {
    max_requests: 2,
    window_ms: 60_000,
};
