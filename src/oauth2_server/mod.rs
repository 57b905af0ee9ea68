// ABOUTME: OAuth 2.1 authorization server core with PKCE, rotation and dynamic client registration
// ABOUTME: Owns the token, code and client stores plus snapshot persistence and token endpoint throttling
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Momentum MCP Server Authors

/// Single-use authorization code store
pub mod auth_codes;
/// Client store and RFC 7591 registration validation
pub mod client_registration;
/// HTML consent page rendering
pub mod consent;
/// OAuth 2.0 authorization server endpoints
pub mod endpoints;
/// OAuth 2.0 data models and types
pub mod models;
/// JSON snapshot persistence of tokens and clients
pub mod persistence;
/// Sliding-window rate limiting for the token endpoint
pub mod rate_limiting;
/// Axum routes for the OAuth endpoints
pub mod routes;
/// Access and refresh token store
pub mod token_store;
/// Token generation and PKCE verification
pub mod tokens;

/// Authorization code store
pub use auth_codes::AuthCodeStore;
/// Registered client store
pub use client_registration::ClientStore;

/// OAuth 2.0 authorization server
pub use endpoints::{AuthorizeOutcome, OAuth2AuthorizationServer};

/// Authorization request
pub use models::AuthorizeRequest;
/// Client registration request
pub use models::ClientRegistrationRequest;
/// Client registration response
pub use models::ClientRegistrationResponse;
/// OAuth 2.0 error response
pub use models::OAuth2Error;
/// Token exchange request
pub use models::TokenRequest;
/// Token exchange response
pub use models::TokenResponse;

/// Snapshot persistence
pub use persistence::{LoadSummary, PersistenceManager};
/// Token endpoint rate limiter
pub use rate_limiting::SlidingWindowRateLimiter;
/// OAuth routes
pub use routes::OAuth2Routes;
/// Token store
pub use token_store::{RefreshRejection, TokenStore};
