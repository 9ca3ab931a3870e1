// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-network quota ledger.
//!
//! Before a new item is admitted, the live item count and live aggregate
//! byte size for its network are computed and compared against the hard
//! ceilings. The check and the subsequent insert are two separate steps; a
//! race between concurrent writers on the same network can transiently
//! overshoot a ceiling. That overshoot is accepted and not corrected.

use chrono::{DateTime, Utc};

use crate::config::{MAX_ITEMS_PER_NETWORK, MAX_NETWORK_STORAGE};
use crate::models::NetworkId;
use crate::storage::{NetworkAggregates, ShareDb, ShareDbError};

/// Outcome of a quota check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    /// Within the ceilings; proceed to write. Carries the usage measured at
    /// check time so callers can report post-write totals.
    Admitted(NetworkAggregates),
    /// A ceiling was hit. Carries current usage for user-facing messaging.
    Exceeded {
        current_count: u64,
        current_bytes: u64,
    },
}

/// Check whether a network may admit one more item of `proposed_bytes`
/// (0 for text items, which are bounded separately by content length).
pub fn check_admission(
    db: &ShareDb,
    network_id: &NetworkId,
    proposed_bytes: u64,
    now: DateTime<Utc>,
) -> Result<QuotaDecision, ShareDbError> {
    let usage = db.network_aggregates(network_id, now)?;

    let over_count = usage.live_items >= MAX_ITEMS_PER_NETWORK;
    let over_bytes =
        proposed_bytes > 0 && usage.stored_bytes + proposed_bytes >= MAX_NETWORK_STORAGE;

    if over_count || over_bytes {
        Ok(QuotaDecision::Exceeded {
            current_count: usage.live_items,
            current_bytes: usage.stored_bytes,
        })
    } else {
        Ok(QuotaDecision::Admitted(usage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::expiry;
    use crate::models::{ItemKind, SharedItem};

    fn temp_db() -> (ShareDb, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = ShareDb::open(&dir.path().join("share.redb")).unwrap();
        (db, dir)
    }

    fn net() -> NetworkId {
        NetworkId::parse(&"ab".repeat(32)).unwrap()
    }

    fn file_item(id: &str, network_id: &NetworkId, bytes: u64, now: DateTime<Utc>) -> SharedItem {
        SharedItem {
            id: id.to_string(),
            kind: ItemKind::File,
            content: format!("http://example.test/blobs/{id}"),
            file_name: Some("f.bin".into()),
            file_size: Some(bytes),
            mime_type: Some("application/pdf".into()),
            network_id: network_id.clone(),
            created_at: now,
            expires_at: expiry::item_expiry(now),
            download_count: 0,
        }
    }

    fn text_item(id: &str, network_id: &NetworkId, now: DateTime<Utc>) -> SharedItem {
        SharedItem {
            id: id.to_string(),
            kind: ItemKind::Text,
            content: "hello".into(),
            file_name: None,
            file_size: None,
            mime_type: None,
            network_id: network_id.clone(),
            created_at: now,
            expires_at: expiry::item_expiry(now),
            download_count: 0,
        }
    }

    #[test]
    fn item_ceiling_rejects_the_26th_write() {
        let (db, _dir) = temp_db();
        let network = net();
        let now = Utc::now();

        for i in 0..MAX_ITEMS_PER_NETWORK - 1 {
            db.insert_item(&text_item(&format!("i-{i}"), &network, now))
                .unwrap();
        }

        // At 24 live items one more write is admitted.
        let decision = check_admission(&db, &network, 0, now).unwrap();
        assert!(matches!(decision, QuotaDecision::Admitted(_)));
        db.insert_item(&text_item("i-24", &network, now)).unwrap();

        // At the ceiling the next write is rejected with current usage.
        match check_admission(&db, &network, 0, now).unwrap() {
            QuotaDecision::Exceeded {
                current_count,
                current_bytes,
            } => {
                assert_eq!(current_count, MAX_ITEMS_PER_NETWORK);
                assert_eq!(current_bytes, 0);
            }
            QuotaDecision::Admitted(_) => panic!("ceiling must reject"),
        }
    }

    #[test]
    fn byte_ceiling_rejects_a_two_byte_file() {
        let (db, _dir) = temp_db();
        let network = net();
        let now = Utc::now();

        db.insert_item(&file_item("big", &network, MAX_NETWORK_STORAGE - 1, now))
            .unwrap();

        match check_admission(&db, &network, 2, now).unwrap() {
            QuotaDecision::Exceeded { current_bytes, .. } => {
                assert_eq!(current_bytes, MAX_NETWORK_STORAGE - 1);
            }
            QuotaDecision::Admitted(_) => panic!("byte ceiling must reject"),
        }

        // A zero-byte proposal (text) ignores the byte ceiling.
        assert!(matches!(
            check_admission(&db, &network, 0, now).unwrap(),
            QuotaDecision::Admitted(_)
        ));
    }

    #[test]
    fn expired_items_do_not_count_against_quota() {
        let (db, _dir) = temp_db();
        let network = net();
        let now = Utc::now();

        let mut old = file_item("old", &network, MAX_NETWORK_STORAGE - 1, now);
        old.created_at = now - chrono::Duration::hours(25);
        old.expires_at = expiry::item_expiry(old.created_at);
        db.insert_item(&old).unwrap();

        match check_admission(&db, &network, MAX_NETWORK_STORAGE / 2, now).unwrap() {
            QuotaDecision::Admitted(usage) => {
                assert_eq!(usage.live_items, 0);
                assert_eq!(usage.stored_bytes, 0);
            }
            QuotaDecision::Exceeded { .. } => panic!("expired usage must not count"),
        }
    }

}
