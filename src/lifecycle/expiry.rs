// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Expiry policy: TTL assignment and live/expired classification.
//!
//! Liveness is decided at read time from the record's own timestamps, never
//! from whether the sweeper happened to run. Every read path calls into
//! these checks; physical deletion is a separate concern.

use chrono::{DateTime, Duration, Utc};

use crate::config::{ITEM_TTL_HOURS, SESSION_ACTIVE_WINDOW_SECS, VERY_OLD_ITEM_HOURS};

/// Expiry instant for an item created at `created_at`. Fixed 24-hour TTL,
/// not configurable per item.
pub fn item_expiry(created_at: DateTime<Utc>) -> DateTime<Utc> {
    created_at + Duration::hours(ITEM_TTL_HOURS)
}

/// An item is live iff the current instant is strictly before its expiry.
pub fn item_is_live(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now < expires_at
}

/// A session is active iff it was seen within the last 5 minutes.
pub fn session_is_active(last_seen: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - last_seen < Duration::seconds(SESSION_ACTIVE_WINDOW_SECS)
}

/// Sessions with `last_seen` at or before this instant are stale: they no
/// longer count as active and are eligible for deletion.
pub fn session_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::seconds(SESSION_ACTIVE_WINDOW_SECS)
}

/// Items created at or before this instant are deleted by the sweeper's
/// absolute-age backstop regardless of their recorded expiry.
pub fn very_old_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::hours(VERY_OLD_ITEM_HOURS)
}
