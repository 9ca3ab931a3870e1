// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Background Sweep Task
//!
//! Periodic loop that invokes the opportunistic sweep so expired records
//! are reclaimed even when no client is polling `/v1/cleanup`. Because it
//! goes through the same throttle as the HTTP endpoint, the two can never
//! double-sweep within one interval.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::lifecycle::{SweepOutcome, Sweeper};
use crate::storage::ShareDb;

/// Default interval between sweep attempts. Matches the sweeper's own
/// throttle so every attempt past the first interval does real work.
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Background cleanup loop over the shared sweeper and database.
pub struct SweepTask {
    db: Arc<ShareDb>,
    sweeper: Arc<Sweeper>,
    interval: Duration,
}

impl SweepTask {
    /// Create a new task over the service's database and sweeper.
    pub fn new(db: Arc<ShareDb>, sweeper: Arc<Sweeper>) -> Self {
        Self {
            db,
            sweeper,
            interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    /// Run the sweep loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(task.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            "cleanup sweep task starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("cleanup sweep task shutting down");
                return;
            }

            self.sweep_step().await;

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("cleanup sweep task shutting down");
                    return;
                }
            }
        }
    }

    /// Execute one sweep attempt. Failures are reported and swallowed; the
    /// loop always survives to retry on the next tick.
    async fn sweep_step(&self) {
        match self.sweeper.opportunistic(&self.db, chrono::Utc::now()).await {
            Ok(SweepOutcome::Completed(stats)) => {
                debug!(
                    expired_items = stats.expired_items,
                    stale_sessions = stats.stale_sessions,
                    very_old_items = stats.very_old_items,
                    "background sweep completed"
                );
            }
            Ok(SweepOutcome::Skipped) => {
                debug!("background sweep skipped; throttle interval not elapsed");
            }
            Err(e) => {
                warn!(error = %e, "background sweep failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::expiry;
    use crate::models::{ItemKind, SharedItem};
    use chrono::{Duration as ChronoDuration, Utc};

    fn temp_db() -> (Arc<ShareDb>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = ShareDb::open(&dir.path().join("share.redb")).unwrap();
        (Arc::new(db), dir)
    }

    #[tokio::test]
    async fn sweep_step_reclaims_expired_items() {
        let (db, _dir) = temp_db();
        let created_at = Utc::now() - ChronoDuration::hours(25);
        db.insert_item(&SharedItem {
            id: "expired".into(),
            kind: ItemKind::Text,
            content: "old".into(),
            file_name: None,
            file_size: None,
            mime_type: None,
            network_id: crate::lifecycle::identity::network_id_for("10.0.0.5"),
            created_at,
            expires_at: expiry::item_expiry(created_at),
            download_count: 0,
        })
        .unwrap();

        let task = SweepTask::new(db.clone(), Arc::new(Sweeper::new()));
        task.sweep_step().await;

        assert!(db.get_item("expired").unwrap().is_none());
    }

    #[tokio::test]
    async fn run_exits_on_cancellation() {
        let (db, _dir) = temp_db();
        let task = SweepTask::new(db, Arc::new(Sweeper::new()));
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        // Returns promptly instead of sleeping out the interval.
        task.run(shutdown).await;
    }
}
