// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Network identity resolution and session presence.
//!
//! Clients never register; "same LAN" grouping falls out of the apparent
//! address. IPv4 addresses group by /24 (first three octets); anything else
//! drops its trailing `:`-separated segment, falling back to the whole
//! address when there is no separator. The normalized subnet string is
//! hashed with SHA-256 and the lowercase hex digest is the identity, so the
//! mapping is one-way, fixed-length, and stable.

use std::net::Ipv4Addr;

use axum::http::{header, HeaderMap};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::models::{NetworkId, Session};
use crate::storage::{ShareDb, ShareDbError};

use super::expiry;

/// Address assumed when no forwarding header is present (direct LAN hit
/// through a reverse proxy that strips headers, or local testing).
const FALLBACK_ADDRESS: &str = "127.0.0.1";

/// Result of resolving a caller's network identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkPresence {
    pub network_id: NetworkId,
    /// Sessions on this network seen within the active window.
    pub connected_users: u64,
    pub client_address: String,
}

/// Apparent client address: first `x-forwarded-for` entry, then
/// `x-real-ip`, then the loopback fallback.
pub fn client_address(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(FALLBACK_ADDRESS)
        .to_string()
}

/// Reported user agent, if any.
pub fn user_agent(headers: &HeaderMap) -> String {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("Unknown")
        .to_string()
}

/// Normalized subnet string an address groups under.
///
/// `10.1.2.3` becomes `10.1.2`; `fe80::1` becomes `fe80:`-prefix minus its
/// last segment; an address with no separator at all groups as itself.
fn subnet_fingerprint(address: &str) -> &str {
    if address.parse::<Ipv4Addr>().is_ok() {
        match address.rfind('.') {
            Some(idx) => &address[..idx],
            None => address,
        }
    } else {
        match address.rfind(':') {
            Some(idx) => &address[..idx],
            None => address,
        }
    }
}

/// Derive the stable network identity for an apparent address.
pub fn network_id_for(address: &str) -> NetworkId {
    let digest = Sha256::digest(subnet_fingerprint(address).as_bytes());
    NetworkId::from_digest(hex::encode(digest))
}

/// Resolve a caller: derive the identity, record presence, reclaim stale
/// sessions, and count who else is currently here.
pub fn resolve(
    db: &ShareDb,
    client_address: String,
    user_agent: String,
    now: DateTime<Utc>,
) -> Result<NetworkPresence, ShareDbError> {
    let network_id = network_id_for(&client_address);

    db.upsert_session(&Session {
        network_id: network_id.clone(),
        client_address: client_address.clone(),
        user_agent,
        last_seen: now,
    })?;

    // Reclaim eagerly so the connected-user count below is not inflated by
    // peers that left; the sweeper covers the same ground as a backstop.
    db.delete_stale_sessions(expiry::session_cutoff(now))?;

    let connected_users = db.count_active_sessions(&network_id, expiry::session_cutoff(now))?;

    Ok(NetworkPresence {
        network_id,
        connected_users,
        client_address,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn same_subnet_same_identity() {
        let a = network_id_for("10.0.0.5");
        let b = network_id_for("10.0.0.200");
        assert_eq!(a, b);

        // Deriving twice is stable.
        assert_eq!(a, network_id_for("10.0.0.5"));
    }

    #[test]
    fn different_subnet_different_identity() {
        assert_ne!(network_id_for("10.0.0.5"), network_id_for("10.0.1.5"));
    }

    #[test]
    fn identity_is_valid_network_id() {
        let id = network_id_for("192.168.1.77");
        assert!(NetworkId::parse(id.as_str()).is_some());
    }

    #[test]
    fn ipv6_groups_by_trailing_segment_removal() {
        assert_eq!(subnet_fingerprint("fe80::aaaa:1"), "fe80::aaaa");
        assert_eq!(
            network_id_for("fe80::aaaa:1"),
            network_id_for("fe80::aaaa:2")
        );
    }

    #[test]
    fn separatorless_address_groups_as_itself() {
        assert_eq!(subnet_fingerprint("localhost"), "localhost");
        assert_eq!(network_id_for("localhost"), network_id_for("localhost"));
    }

    #[test]
    fn client_address_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("10.0.0.9, 172.16.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.8"));
        assert_eq!(client_address(&headers), "10.0.0.9");
    }

    #[test]
    fn client_address_falls_back_to_real_ip_then_loopback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.8"));
        assert_eq!(client_address(&headers), "10.0.0.8");

        assert_eq!(client_address(&HeaderMap::new()), "127.0.0.1");
    }
}
