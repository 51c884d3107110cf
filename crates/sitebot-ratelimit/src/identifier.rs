// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client identifier extraction for rate limiting.
//!
//! Identifier = client IP, optionally suffixed with a session id so
//! multiple widget sessions behind one NAT are limited independently.

use std::net::IpAddr;

/// Resolves the client IP from proxy headers and the peer address.
///
/// Prefers the first entry of `X-Forwarded-For`, falling back to the
/// direct peer address. Anything that does not parse as an IP defaults
/// to `0.0.0.0` rather than failing the request.
pub fn client_ip(forwarded_for: Option<&str>, peer_addr: Option<&str>) -> String {
    if let Some(header) = forwarded_for {
        let first = header.split(',').next().unwrap_or("").trim();
        if first.parse::<IpAddr>().is_ok() {
            return first.to_string();
        }
    }

    if let Some(peer) = peer_addr {
        let host = peer.rsplit_once(':').map(|(h, _)| h).unwrap_or(peer);
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.parse::<IpAddr>().is_ok() {
            return host.to_string();
        }
        if peer.parse::<IpAddr>().is_ok() {
            return peer.to_string();
        }
    }

    "0.0.0.0".to_string()
}

/// Builds the rate-limit identifier from an IP and an optional session id.
pub fn rate_limit_identifier(ip: &str, session_id: Option<&str>) -> String {
    match session_id {
        Some(session) if !session.is_empty() => format!("{ip}:{session}"),
        _ => ip.to_string(),
    }
}
