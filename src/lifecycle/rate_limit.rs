// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fixed-window request limiter keyed by client address.
//!
//! Each caller gets a non-sliding window: the first request (or the first
//! after the window elapses) starts a fresh window with `count = 1`;
//! requests inside the window increment the count until the per-call-site
//! ceiling, after which they are denied with the unchanged reset instant.
//!
//! The window table lives inside the `RateLimiter` value and is handed to
//! the router via `AppState`, so tests construct and inspect their own
//! instance. State is process-local; with several instances behind a load
//! balancer each keeps independent counters.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

/// Expired windows are reclaimed on every Nth call to bound table growth.
const PURGE_EVERY: u32 = 16;

/// Per-call-site limit parameters. Endpoint classes use different pairs;
/// see the constants in `config`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatePolicy {
    /// Requests admitted per window.
    pub max_requests: u32,
    /// Window length in milliseconds.
    pub window_ms: i64,
}

/// Outcome of a limiter check. Denial is a normal result, distinct from
/// any backend failure (the limiter itself cannot fail).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// Request admitted; `remaining` may be spent before `reset_at`.
    Admitted {
        remaining: u32,
        reset_at: DateTime<Utc>,
    },
    /// Ceiling reached; the caller may retry once `reset_at` passes.
    Limited { reset_at: DateTime<Utc> },
}

impl RateDecision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, RateDecision::Admitted { .. })
    }
}

#[derive(Debug, Clone)]
struct RateWindow {
    count: u32,
    reset_at: DateTime<Utc>,
}

#[derive(Default)]
struct WindowTable {
    windows: HashMap<String, RateWindow>,
    calls_since_purge: u32,
}

/// Fixed-window counter table for all callers.
#[derive(Default)]
pub struct RateLimiter {
    table: Mutex<WindowTable>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check and record a request from `caller` under `policy`.
    pub async fn allow(&self, caller: &str, policy: RatePolicy) -> RateDecision {
        self.allow_at(caller, policy, Utc::now()).await
    }

    /// Same as [`allow`](Self::allow) with an explicit clock, so tests can
    /// drive window expiry without sleeping.
    pub async fn allow_at(
        &self,
        caller: &str,
        policy: RatePolicy,
        now: DateTime<Utc>,
    ) -> RateDecision {
        let mut table = self.table.lock().await;

        table.calls_since_purge += 1;
        if table.calls_since_purge >= PURGE_EVERY {
            table.calls_since_purge = 0;
            // Only windows whose reset instant has passed are reclaimed;
            // an unexpired window is never evicted, whatever its count.
            table.windows.retain(|_, w| w.reset_at > now);
        }

        let fresh = RateWindow {
            count: 0,
            reset_at: now + Duration::milliseconds(policy.window_ms),
        };
        let window = table
            .windows
            .entry(caller.to_string())
            .or_insert(fresh.clone());
        if window.reset_at <= now {
            // Fixed window: elapsed windows reset entirely, never slide.
            *window = fresh;
        }

        if window.count < policy.max_requests {
            window.count += 1;
            RateDecision::Admitted {
                remaining: policy.max_requests - window.count,
                reset_at: window.reset_at,
            }
        } else {
            RateDecision::Limited {
                reset_at: window.reset_at,
            }
        }
    }

    /// Number of tracked windows. Exposed for tests and diagnostics.
    pub async fn window_count(&self) -> usize {
        self.table.lock().await.windows.len()
    }
}
