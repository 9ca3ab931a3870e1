// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cleanup sweeper: bulk reclamation of expired and stale records.
//!
//! Two entry points share the same deletions:
//!
//! - [`Sweeper::force`] always runs: items past expiry, sessions outside
//!   the active window, and items older than the 48-hour absolute ceiling
//!   (a backstop against any future bug that writes a wrong expiry).
//! - [`Sweeper::opportunistic`] performs real work at most once per the
//!   throttle interval; calls inside the interval return
//!   [`SweepOutcome::Skipped`].
//!
//! Sweeps only ever delete; they never block writers and have no cascading
//! effects. Running a sweep repeatedly with no new data converges: deleting
//! an already-deleted record is a no-op. A failed sweep reports the error
//! and does not advance the last-run timestamp, so the next opportunity
//! retries instead of silently going quiet for a full interval.

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::SWEEP_MIN_INTERVAL_SECS;
use crate::models::CleanupStats;
use crate::storage::{ShareDb, ShareDbError};

use super::expiry;

/// Outcome of an opportunistic sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepOutcome {
    /// A real sweep ran; deletion counts attached.
    Completed(CleanupStats),
    /// The throttle interval had not elapsed; nothing was done.
    Skipped,
}

/// Throttled, idempotent cleanup runner.
///
/// Owns the process-local last-run timestamp so tests construct their own
/// instance and drive it with explicit clocks.
pub struct Sweeper {
    last_run: Mutex<Option<DateTime<Utc>>>,
    min_interval: Duration,
}

impl Default for Sweeper {
    fn default() -> Self {
        Self::new()
    }
}

impl Sweeper {
    pub fn new() -> Self {
        Self::with_interval(Duration::seconds(SWEEP_MIN_INTERVAL_SECS))
    }

    /// Build a sweeper with a custom throttle interval (tests).
    pub fn with_interval(min_interval: Duration) -> Self {
        Self {
            last_run: Mutex::new(None),
            min_interval,
        }
    }

    /// Delete everything whose logical life has ended, unconditionally.
    ///
    /// Each category is an independent bulk deletion; a failure leaves the
    /// remaining data untouched.
    // TODO: also reclaim blob files of the deleted file items (needs the
    // blob store handle wired in here; today only explicit item deletion
    // removes its blob).
    pub fn force(&self, db: &ShareDb, now: DateTime<Utc>) -> Result<CleanupStats, ShareDbError> {
        let expired_items = db.delete_expired_items(now)?;
        let stale_sessions = db.delete_stale_sessions(expiry::session_cutoff(now))?;
        let very_old_items = db.delete_items_created_before(expiry::very_old_cutoff(now))?;

        let stats = CleanupStats {
            expired_items,
            stale_sessions,
            very_old_items,
        };

        if stats.expired_items > 0 || stats.stale_sessions > 0 || stats.very_old_items > 0 {
            info!(
                expired_items = stats.expired_items,
                stale_sessions = stats.stale_sessions,
                very_old_items = stats.very_old_items,
                "cleanup sweep removed records"
            );
        }

        Ok(stats)
    }

    /// Run [`force`](Self::force) unless it already ran within the
    /// throttle interval. Redundant calls are cheap no-ops, not errors.
    pub async fn opportunistic(
        &self,
        db: &ShareDb,
        now: DateTime<Utc>,
    ) -> Result<SweepOutcome, ShareDbError> {
        // Hold the guard across the sweep so concurrent opportunistic
        // callers serialize instead of double-sweeping.
        let mut last_run = self.last_run.lock().await;

        if let Some(last) = *last_run {
            if now - last < self.min_interval {
                return Ok(SweepOutcome::Skipped);
            }
        }

        match self.force(db, now) {
            Ok(stats) => {
                *last_run = Some(now);
                Ok(SweepOutcome::Completed(stats))
            }
            Err(e) => {
                // The timestamp stays put: the next call retries instead of
                // treating the failed pass as done.
                warn!(error = %e, "opportunistic sweep failed");
                Err(e)
            }
        }
    }
}
