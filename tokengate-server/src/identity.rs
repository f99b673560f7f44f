//! Client identifier derivation
//!
//! The admission controller keys buckets by an opaque string. At the edge the
//! best available key is the originating IP, which proxies and CDNs report in
//! request headers ahead of the socket peer address.

use axum::http::HeaderMap;
use std::net::SocketAddr;

/// Identifier used when nothing in the request identifies the client
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Headers consulted in order; the first non-empty value wins
const FORWARDING_HEADERS: [&str; 3] = ["x-forwarded-for", "x-real-ip", "cf-connecting-ip"];

/// Derive the rate limit key for a request
///
/// Takes the first entry of `X-Forwarded-For`, then `X-Real-IP`, then
/// `CF-Connecting-IP`, then the peer's IP, and finally [`UNKNOWN_CLIENT`].
pub fn client_identifier(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    FORWARDING_HEADERS
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(',').next())
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}
