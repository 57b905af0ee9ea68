// ABOUTME: HTTP middleware for bearer authentication, token endpoint throttling and request tracing
// ABOUTME: Adapts the authorization core to axum's middleware::from_fn_with_state
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Momentum MCP Server Authors

/// Bearer token authentication
pub mod auth;
/// Token endpoint rate limiting
pub mod rate_limiting;
/// Request ID generation and request spans
pub mod tracing;

// Authentication middleware
pub use auth::{
    require_bearer, BearerAuth, MultiValidator, OAuthTokenValidator, StaticTokenValidator,
    TokenValidator,
};

// Rate limiting middleware and utilities
pub use rate_limiting::{client_addr, create_rate_limit_headers, headers, token_rate_limit};

// Request tracing
pub use self::tracing::{create_request_span, MakeRequestUuid, REQUEST_ID_HEADER};
