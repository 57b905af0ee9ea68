// ABOUTME: OAuth 2.0 data models for tokens, authorization codes, clients and the persisted snapshot
// ABOUTME: Implements RFC 6749, RFC 7591 and RFC 8414 request/response structures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Momentum MCP Server Authors

use std::collections::HashMap;

use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Kind of an issued token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Presented as a bearer credential on protected endpoints
    Access,
    /// Exchanged at the token endpoint for a new pair
    Refresh,
}

/// One issued token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Opaque random value, also the lookup key
    pub value: String,
    /// Access or refresh
    pub kind: TokenKind,
    /// Owning client
    pub client_id: String,
    /// Issuance time
    pub issued_at: DateTime<Utc>,
    /// First instant at which the token is no longer valid
    pub expires_at: DateTime<Utc>,
    /// For access tokens, the refresh token that produced it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_refresh: Option<String>,
}

impl TokenRecord {
    /// A record is valid iff `now < expires_at`
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Single-use code bound to a client, redirect URI and PKCE challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCode {
    /// Code value
    pub code: String,
    /// Client the code was issued to
    pub client_id: String,
    /// Redirect URI the code was delivered to
    pub redirect_uri: String,
    /// PKCE challenge
    pub code_challenge: String,
    /// PKCE method, always `S256`
    pub code_challenge_method: String,
    /// First instant at which the code is no longer redeemable
    pub expires_at: DateTime<Utc>,
    /// Set by the first successful redemption
    pub used: bool,
}

impl AuthorizationCode {
    /// Whether the code can still be redeemed at `now`
    #[must_use]
    pub fn is_redeemable_at(&self, now: DateTime<Utc>) -> bool {
        !self.used && now < self.expires_at
    }
}

/// A registered OAuth client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    /// Client identifier
    pub client_id: String,
    /// Display name shown on the consent page
    #[serde(default)]
    pub client_name: String,
    /// Exact-match redirect URIs
    pub redirect_uris: Vec<String>,
    /// Registration time
    pub created_at: DateTime<Utc>,
}

impl ClientRecord {
    /// Name for display, falling back to the identifier
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.client_name.is_empty() {
            &self.client_id
        } else {
            &self.client_name
        }
    }
}

/// On-disk snapshot of token and client state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedSnapshot {
    /// Non-expired tokens keyed by value
    #[serde(default)]
    pub tokens: HashMap<String, TokenRecord>,
    /// Clients keyed by identifier
    #[serde(default)]
    pub clients: HashMap<String, ClientRecord>,
    /// When the snapshot was written
    pub saved_at: Option<DateTime<Utc>>,
}

/// Query or form parameters of the authorization endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorizeRequest {
    /// Client identifier
    #[serde(default)]
    pub client_id: String,
    /// Redirect URI for response
    #[serde(default)]
    pub redirect_uri: String,
    /// Response type, must be `code`
    #[serde(default)]
    pub response_type: String,
    /// Opaque client state echoed back
    #[serde(default)]
    pub state: String,
    /// PKCE code challenge (RFC 7636)
    #[serde(default)]
    pub code_challenge: String,
    /// PKCE code challenge method, must be `S256`
    #[serde(default)]
    pub code_challenge_method: String,
}

/// Consent form submission
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConsentForm {
    /// Flow parameters carried as hidden fields
    #[serde(flatten)]
    pub request: AuthorizeRequest,
    /// PIN typed by the user
    #[serde(default)]
    pub pin: String,
    /// `approve` or `deny`
    #[serde(default)]
    pub action: String,
}

/// Token endpoint form body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenRequest {
    /// `authorization_code` or `refresh_token`
    #[serde(default)]
    pub grant_type: String,
    /// Authorization code
    #[serde(default)]
    pub code: String,
    /// PKCE verifier
    #[serde(default)]
    pub code_verifier: String,
    /// Client identifier
    #[serde(default)]
    pub client_id: String,
    /// Redirect URI the code was issued for
    #[serde(default)]
    pub redirect_uri: String,
    /// Refresh token being rotated
    #[serde(default)]
    pub refresh_token: String,
}

/// Successful token endpoint response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Access token
    pub access_token: String,
    /// Always `Bearer`
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    /// Refresh token
    pub refresh_token: String,
    /// Granted scopes
    pub scope: String,
}

/// Dynamic client registration request (RFC 7591)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientRegistrationRequest {
    /// Optional display name
    #[serde(default)]
    pub client_name: Option<String>,
    /// Redirect URIs, at least one required
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    /// Requested grant types; the server always grants its fixed set
    #[serde(default)]
    pub grant_types: Option<Vec<String>>,
}

/// Dynamic client registration response (RFC 7591)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientRegistrationResponse {
    /// Assigned client identifier
    pub client_id: String,
    /// Display name
    pub client_name: String,
    /// Registered redirect URIs
    pub redirect_uris: Vec<String>,
    /// Grant types the client may use
    pub grant_types: Vec<String>,
    /// Response types the client may use
    pub response_types: Vec<String>,
    /// Always `none`: clients are public
    pub token_endpoint_auth_method: String,
    /// Registration time in seconds since the epoch
    pub client_id_issued_at: i64,
}

/// Protected resource metadata (RFC 9728)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectedResourceMetadata {
    /// Resource identifier, the public base URL
    pub resource: String,
    /// Authorization servers protecting the resource
    pub authorization_servers: Vec<String>,
    /// Supported scopes
    pub scopes_supported: Vec<String>,
    /// Where bearer tokens may be presented
    pub bearer_methods_supported: Vec<String>,
}

/// Authorization server metadata (RFC 8414)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationServerMetadata {
    /// Issuer identifier, the public base URL
    pub issuer: String,
    /// Authorization endpoint URL
    pub authorization_endpoint: String,
    /// Token endpoint URL
    pub token_endpoint: String,
    /// Dynamic registration endpoint URL
    pub registration_endpoint: String,
    /// Always `["code"]`
    pub response_types_supported: Vec<String>,
    /// Authorization code and refresh token
    pub grant_types_supported: Vec<String>,
    /// Always `["S256"]`
    pub code_challenge_methods_supported: Vec<String>,
    /// Always `["none"]`
    pub token_endpoint_auth_methods_supported: Vec<String>,
    /// Supported scopes
    pub scopes_supported: Vec<String>,
    /// Human-readable documentation
    pub service_documentation: String,
}

/// OAuth 2.0 error response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth2Error {
    /// Error code
    pub error: String,
    /// Human-readable error description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl OAuth2Error {
    fn with(error: &str, description: &str) -> Self {
        Self {
            error: error.to_owned(),
            error_description: Some(description.to_owned()),
        }
    }

    /// Create an `invalid_request` error
    #[must_use]
    pub fn invalid_request(description: &str) -> Self {
        Self::with("invalid_request", description)
    }

    /// Create an `invalid_grant` error
    #[must_use]
    pub fn invalid_grant(description: &str) -> Self {
        Self::with("invalid_grant", description)
    }

    /// Create an `unsupported_grant_type` error
    #[must_use]
    pub fn unsupported_grant_type() -> Self {
        Self::with(
            "unsupported_grant_type",
            "Only authorization_code and refresh_token grants are supported",
        )
    }

    /// Create an `unsupported_response_type` error
    #[must_use]
    pub fn unsupported_response_type() -> Self {
        Self::with(
            "unsupported_response_type",
            "Only response_type=code is supported",
        )
    }

    /// Create an `invalid_client_metadata` error (RFC 7591)
    #[must_use]
    pub fn invalid_client_metadata(description: &str) -> Self {
        Self::with("invalid_client_metadata", description)
    }

    /// Create an `invalid_redirect_uri` error (RFC 7591)
    #[must_use]
    pub fn invalid_redirect_uri(description: &str) -> Self {
        Self::with("invalid_redirect_uri", description)
    }

    /// Create a `server_error`; the description never carries internal detail
    #[must_use]
    pub fn server_error() -> Self {
        Self::with("server_error", "Internal server error")
    }

    /// Create a `too_many_requests` error for throttled token requests
    #[must_use]
    pub fn too_many_requests(window_secs: u64) -> Self {
        Self::with(
            "too_many_requests",
            &format!("Too many token requests, retry in {window_secs} seconds"),
        )
    }

    /// HTTP status for this error
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self.error.as_str() {
            "server_error" => 500,
            "too_many_requests" => 429,
            _ => 400,
        }
    }
}

impl IntoResponse for OAuth2Error {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::BAD_REQUEST);
        (status, Json(self)).into_response()
    }
}

impl From<AppError> for OAuth2Error {
    fn from(error: AppError) -> Self {
        tracing::error!(code = ?error.code, "oauth request failed: {error}");
        Self::server_error()
    }
}
