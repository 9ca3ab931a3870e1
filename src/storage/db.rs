// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded share database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `items`: item id → serialized SharedItem
//! - `network_item_index`: composite key (network_id|!timestamp|id) → kind
//! - `sessions`: composite key (network_id|client_address) → serialized Session
//!
//! The index key inverts the creation timestamp so a forward range scan
//! yields newest-first ordering per network.

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use crate::models::{NetworkId, Session, SharedItem};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: item id → serialized SharedItem (JSON bytes).
const ITEMS: TableDefinition<&str, &[u8]> = TableDefinition::new("items");

/// Index: composite key → item kind ("text"|"file").
/// Key format: `network_id|!timestamp_be|item_id` for descending-time scans.
const NETWORK_ITEM_INDEX: TableDefinition<&[u8], &str> =
    TableDefinition::new("network_item_index");

/// Sessions: `network_id|client_address` → serialized Session (JSON bytes).
const SESSIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("sessions");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ShareDbError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type ShareDbResult<T> = Result<T, ShareDbError>;

// =============================================================================
// Index Key Helpers
// =============================================================================

/// Build a composite key for the network_item_index table.
///
/// Format: `network_id | inverted_timestamp_be_bytes | item_id`
///
/// The inverted timestamp ensures newest-first ordering when scanning forward.
fn make_index_key(network_id: &NetworkId, timestamp: i64, item_id: &str) -> Vec<u8> {
    let net = network_id.as_str();
    let mut key = Vec::with_capacity(net.len() + 1 + 8 + 1 + item_id.len());
    key.extend_from_slice(net.as_bytes());
    key.push(b'|');
    // Invert timestamp for descending order (newest first)
    key.extend_from_slice(&(!timestamp as u64).to_be_bytes());
    key.push(b'|');
    key.extend_from_slice(item_id.as_bytes());
    key
}

/// Build a prefix key for range scanning all items of a network.
fn make_prefix(network_id: &NetworkId) -> Vec<u8> {
    let net = network_id.as_str();
    let mut prefix = Vec::with_capacity(net.len() + 1);
    prefix.extend_from_slice(net.as_bytes());
    prefix.push(b'|');
    prefix
}

/// Build the upper bound for a range scan (prefix with all 0xFF bytes appended).
fn make_prefix_end(network_id: &NetworkId) -> Vec<u8> {
    let mut end = make_prefix(network_id);
    end.extend_from_slice(&[0xFF; 20]);
    end
}

/// Extract the item id portion from a composite index key.
///
/// Key format: `network_id|timestamp_bytes|item_id`
fn extract_item_id_from_key(key: &[u8]) -> Option<String> {
    let mut pipe_count = 0;
    for (i, &b) in key.iter().enumerate() {
        if b == b'|' {
            pipe_count += 1;
            if pipe_count == 2 {
                return String::from_utf8(key[i + 1..].to_vec()).ok();
            }
        }
    }
    None
}

/// Composite key for the sessions table.
fn session_key(network_id: &NetworkId, client_address: &str) -> String {
    format!("{}|{client_address}", network_id.as_str())
}

// =============================================================================
// Aggregates
// =============================================================================

/// Live totals for one network, measured at a given instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkAggregates {
    /// Number of live items.
    pub live_items: u64,
    /// Sum of live file sizes in bytes (text items contribute 0).
    pub stored_bytes: u64,
    /// Sum of download counters across live items.
    pub download_total: u64,
}

// =============================================================================
// ShareDb
// =============================================================================

/// Embedded ACID database for shared items and presence sessions.
pub struct ShareDb {
    db: Database,
}

impl ShareDb {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> ShareDbResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ITEMS)?;
            let _ = write_txn.open_table(NETWORK_ITEM_INDEX)?;
            let _ = write_txn.open_table(SESSIONS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Cheap connectivity probe for readiness checks.
    pub fn health_check(&self) -> ShareDbResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(ITEMS)?;
        Ok(())
    }

    // =========================================================================
    // Item CRUD
    // =========================================================================

    /// Insert a shared item and its index entry.
    pub fn insert_item(&self, item: &SharedItem) -> ShareDbResult<()> {
        let json = serde_json::to_vec(item)?;
        let key = make_index_key(&item.network_id, item.created_at.timestamp(), &item.id);

        let write_txn = self.db.begin_write()?;
        {
            let mut items = write_txn.open_table(ITEMS)?;
            items.insert(item.id.as_str(), json.as_slice())?;

            let mut index = write_txn.open_table(NETWORK_ITEM_INDEX)?;
            index.insert(key.as_slice(), item.kind.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a single item by id. Returns the raw record; callers apply
    /// the liveness filter themselves.
    pub fn get_item(&self, item_id: &str) -> ShareDbResult<Option<SharedItem>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ITEMS)?;
        match table.get(item_id)? {
            Some(value) => {
                let item: SharedItem = serde_json::from_slice(value.value())?;
                Ok(Some(item))
            }
            None => Ok(None),
        }
    }

    /// Delete one item and its index entry. Returns whether it existed.
    pub fn delete_item(&self, item_id: &str) -> ShareDbResult<bool> {
        let write_txn = self.db.begin_write()?;
        let existed = {
            let mut items = write_txn.open_table(ITEMS)?;
            let removed = {
                match items.remove(item_id)? {
                    Some(guard) => Some(serde_json::from_slice::<SharedItem>(guard.value())?),
                    None => None,
                }
            };

            if let Some(item) = removed {
                let mut index = write_txn.open_table(NETWORK_ITEM_INDEX)?;
                let key = make_index_key(&item.network_id, item.created_at.timestamp(), &item.id);
                index.remove(key.as_slice())?;
                true
            } else {
                false
            }
        };
        write_txn.commit()?;
        Ok(existed)
    }

    /// Live items for a network, newest first, capped at `limit`.
    pub fn list_network_items(
        &self,
        network_id: &NetworkId,
        now: DateTime<Utc>,
        limit: usize,
    ) -> ShareDbResult<Vec<SharedItem>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(NETWORK_ITEM_INDEX)?;
        let items = read_txn.open_table(ITEMS)?;

        let prefix = make_prefix(network_id);
        let prefix_end = make_prefix_end(network_id);

        let mut results = Vec::new();
        for entry in index.range(prefix.as_slice()..prefix_end.as_slice())? {
            let entry = entry?;
            let Some(item_id) = extract_item_id_from_key(entry.0.value()) else {
                continue;
            };
            if let Some(value) = items.get(item_id.as_str())? {
                let item: SharedItem = serde_json::from_slice(value.value())?;
                // Read-path liveness filter; never rely on the sweeper.
                if now < item.expires_at {
                    results.push(item);
                    if results.len() >= limit {
                        break;
                    }
                }
            }
        }

        Ok(results)
    }

    /// Count, byte sum, and download sum over a network's live items.
    pub fn network_aggregates(
        &self,
        network_id: &NetworkId,
        now: DateTime<Utc>,
    ) -> ShareDbResult<NetworkAggregates> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(NETWORK_ITEM_INDEX)?;
        let items = read_txn.open_table(ITEMS)?;

        let prefix = make_prefix(network_id);
        let prefix_end = make_prefix_end(network_id);

        let mut totals = NetworkAggregates::default();
        for entry in index.range(prefix.as_slice()..prefix_end.as_slice())? {
            let entry = entry?;
            let Some(item_id) = extract_item_id_from_key(entry.0.value()) else {
                continue;
            };
            if let Some(value) = items.get(item_id.as_str())? {
                let item: SharedItem = serde_json::from_slice(value.value())?;
                if now < item.expires_at {
                    totals.live_items += 1;
                    totals.stored_bytes += item.file_size.unwrap_or(0);
                    totals.download_total += item.download_count;
                }
            }
        }

        Ok(totals)
    }

    /// Increment an item's download counter if it exists and is live.
    /// Returns the new count, or `None` for absent or expired items.
    pub fn increment_download(
        &self,
        item_id: &str,
        now: DateTime<Utc>,
    ) -> ShareDbResult<Option<u64>> {
        let write_txn = self.db.begin_write()?;
        let new_count = {
            let mut items = write_txn.open_table(ITEMS)?;

            let existing_bytes = {
                let guard = items.get(item_id)?;
                guard.map(|g| g.value().to_vec())
            };
            let existing_bytes = match existing_bytes {
                Some(bytes) => bytes,
                None => {
                    drop(items);
                    write_txn.commit()?;
                    return Ok(None);
                }
            };

            let mut item: SharedItem = serde_json::from_slice(&existing_bytes)?;
            if now >= item.expires_at {
                drop(items);
                write_txn.commit()?;
                return Ok(None);
            }

            item.download_count += 1;
            let json = serde_json::to_vec(&item)?;
            items.insert(item_id, json.as_slice())?;
            item.download_count
        };
        write_txn.commit()?;
        Ok(Some(new_count))
    }

    // =========================================================================
    // Bulk Deletion (sweeper)
    // =========================================================================

    /// Delete all items whose expiry instant has passed. Returns the count.
    pub fn delete_expired_items(&self, now: DateTime<Utc>) -> ShareDbResult<u64> {
        self.delete_items_matching(|item| item.expires_at < now)
    }

    /// Delete all items created at or before `cutoff`, regardless of their
    /// recorded expiry. Returns the count.
    pub fn delete_items_created_before(&self, cutoff: DateTime<Utc>) -> ShareDbResult<u64> {
        self.delete_items_matching(|item| item.created_at <= cutoff)
    }

    fn delete_items_matching(
        &self,
        predicate: impl Fn(&SharedItem) -> bool,
    ) -> ShareDbResult<u64> {
        let write_txn = self.db.begin_write()?;
        let deleted = {
            let mut items = write_txn.open_table(ITEMS)?;

            let mut doomed: Vec<(String, Vec<u8>)> = Vec::new();
            for entry in items.iter()? {
                let (key, value) = entry?;
                let item: SharedItem = serde_json::from_slice(value.value())?;
                if predicate(&item) {
                    doomed.push((
                        key.value().to_string(),
                        make_index_key(&item.network_id, item.created_at.timestamp(), &item.id),
                    ));
                }
            }

            let mut index = write_txn.open_table(NETWORK_ITEM_INDEX)?;
            for (item_id, index_key) in &doomed {
                items.remove(item_id.as_str())?;
                index.remove(index_key.as_slice())?;
            }
            doomed.len() as u64
        };
        write_txn.commit()?;
        Ok(deleted)
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Insert or refresh a presence session.
    pub fn upsert_session(&self, session: &Session) -> ShareDbResult<()> {
        let key = session_key(&session.network_id, &session.client_address);
        let json = serde_json::to_vec(session)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut sessions = write_txn.open_table(SESSIONS)?;
            sessions.insert(key.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Delete sessions whose `last_seen` is at or before `cutoff`.
    /// Returns the count.
    pub fn delete_stale_sessions(&self, cutoff: DateTime<Utc>) -> ShareDbResult<u64> {
        let write_txn = self.db.begin_write()?;
        let deleted = {
            let mut sessions = write_txn.open_table(SESSIONS)?;

            let mut doomed: Vec<String> = Vec::new();
            for entry in sessions.iter()? {
                let (key, value) = entry?;
                let session: Session = serde_json::from_slice(value.value())?;
                if session.last_seen <= cutoff {
                    doomed.push(key.value().to_string());
                }
            }

            for key in &doomed {
                sessions.remove(key.as_str())?;
            }
            doomed.len() as u64
        };
        write_txn.commit()?;
        Ok(deleted)
    }

    /// Sessions on a network seen strictly after `active_after`.
    pub fn count_active_sessions(
        &self,
        network_id: &NetworkId,
        active_after: DateTime<Utc>,
    ) -> ShareDbResult<u64> {
        let read_txn = self.db.begin_read()?;
        let sessions = read_txn.open_table(SESSIONS)?;

        let mut count = 0;
        for entry in sessions.iter()? {
            let entry = entry?;
            let session: Session = serde_json::from_slice(entry.1.value())?;
            if &session.network_id == network_id && session.last_seen > active_after {
                count += 1;
            }
        }
        Ok(count)
    }
}

// =============================================================================
// Tests
// =============================================================================
