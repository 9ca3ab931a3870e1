// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Lifecycle Core
//!
//! Everything that bounds and reclaims shared state lives here:
//!
//! - `quota` - per-network item-count and byte ceilings, enforced at write time
//! - `expiry` - fixed 24-hour TTL assignment and live/expired classification
//! - `sweeper` - idempotent forced and throttled cleanup passes
//! - `rate_limit` - fixed-window request counting per client address
//! - `identity` - subnet fingerprinting and session presence
//!
//! The rate limiter's window table and the sweeper's last-run timestamp are
//! process-local and owned by their structs. Behind a load balancer with
//! several instances, limits and throttles become per-instance approximations;
//! sweeps stay safe because they are idempotent.

pub mod expiry;
pub mod identity;
pub mod quota;
pub mod rate_limit;
pub mod sweeper;

pub use identity::NetworkPresence;
pub use quota::QuotaDecision;
pub use rate_limit::{RateDecision, RateLimiter, RatePolicy};
pub use sweeper::{SweepOutcome, Sweeper};
