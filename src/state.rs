// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::lifecycle::{RateLimiter, Sweeper};
use crate::storage::{BlobStore, ShareDb};

/// Shared application state handed to every handler.
///
/// The limiter and sweeper own the only process-local mutable state in the
/// service (the rate-window table and the last-sweep timestamp); everything
/// else is durable in the database or blob directory.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<ShareDb>,
    pub blobs: Arc<BlobStore>,
    pub limiter: Arc<RateLimiter>,
    pub sweeper: Arc<Sweeper>,
}

impl AppState {
    pub fn new(db: ShareDb, blobs: BlobStore) -> Self {
        Self {
            db: Arc::new(db),
            blobs: Arc::new(blobs),
            limiter: Arc::new(RateLimiter::new()),
            sweeper: Arc::new(Sweeper::new()),
        }
    }
}
