// ABOUTME: Token endpoint throttling middleware keyed by client address
// ABOUTME: Resolves the source address from X-Forwarded-For or the peer and answers 429 with Retry-After
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Momentum MCP Server Authors

//! # Rate Limiting Middleware
//!
//! Applied to `POST /token` only. The limiter itself is
//! [`SlidingWindowRateLimiter`]; this module adapts it to axum.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::{HeaderMap, HeaderName, HeaderValue};
use tracing::warn;

use crate::oauth2_server::models::OAuth2Error;
use crate::oauth2_server::rate_limiting::SlidingWindowRateLimiter;

/// HTTP header names for rate limiting
pub mod headers {
    /// Maximum requests allowed in the window
    pub const X_RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";
    /// Window duration in seconds
    pub const X_RATE_LIMIT_WINDOW: &str = "x-ratelimit-window";
    /// Retry-after duration in seconds
    pub const RETRY_AFTER: &str = "retry-after";
    /// Proxy-supplied client address chain
    pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
}

/// Resolve the client address
///
/// Uses the left-most `X-Forwarded-For` entry when it parses as an IP address,
/// otherwise the transport peer. Requests with neither share one bucket.
#[must_use]
pub fn client_addr(request_headers: &HeaderMap, peer: Option<SocketAddr>) -> IpAddr {
    request_headers
        .get(headers::X_FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .and_then(|chain| chain.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok())
        .or_else(|| peer.map(|addr| addr.ip()))
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Build the 429 response headers
#[must_use]
pub fn create_rate_limit_headers(limiter: &SlidingWindowRateLimiter) -> HeaderMap {
    let mut map = HeaderMap::new();
    let window_secs = limiter.window().as_secs().to_string();

    if let Ok(value) = HeaderValue::from_str(&window_secs) {
        map.insert(HeaderName::from_static(headers::RETRY_AFTER), value.clone());
        map.insert(HeaderName::from_static(headers::X_RATE_LIMIT_WINDOW), value);
    }
    if let Ok(value) = HeaderValue::from_str(&limiter.limit().to_string()) {
        map.insert(HeaderName::from_static(headers::X_RATE_LIMIT_LIMIT), value);
    }
    map
}

/// Axum middleware enforcing the token endpoint limit
pub async fn token_rate_limit(
    State(limiter): State<SlidingWindowRateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let addr = client_addr(request.headers(), peer);

    if limiter.allow(addr) {
        return next.run(request).await;
    }

    warn!(client_addr = %addr, "token endpoint rate limit exceeded");
    let mut response = OAuth2Error::too_many_requests(limiter.window().as_secs()).into_response();
    response
        .headers_mut()
        .extend(create_rate_limit_headers(&limiter));
    response
}
