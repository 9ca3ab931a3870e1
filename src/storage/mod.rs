// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Durable state lives in two places under the data directory:
//!
//! - `share.redb` - embedded redb database holding shared items, the
//!   per-network listing index, and presence sessions
//! - `blobs/` - raw uploaded file payloads plus content-type sidecars
//!
//! Every database operation is a single bounded transaction, atomic per
//! affected document. There are no multi-document transactions; the
//! lifecycle layer's read-time expiry filtering is the source of truth for
//! visibility, and the sweeper's bulk deletes are idempotent.

pub mod blob;
pub mod db;

pub use blob::{BlobError, BlobStore, StoredBlob};
pub use db::{NetworkAggregates, ShareDb, ShareDbError, ShareDbResult};
