// ABOUTME: Bearer token authentication middleware for protected protocol endpoints
// ABOUTME: Combines static shared-secret and OAuth access token validators with OR semantics
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Momentum MCP Server Authors

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use http::{HeaderMap, HeaderValue};

use crate::errors::{AppError, ErrorCode};
use crate::oauth2_server::models::TokenKind;
use crate::oauth2_server::token_store::TokenStore;
use crate::oauth2_server::tokens::constant_time_eq;

/// Something that can accept or reject a presented bearer token
#[async_trait]
pub trait TokenValidator: Send + Sync {
    /// Short name recorded on the request span
    fn name(&self) -> &'static str;

    /// Whether `token` is acceptable
    async fn validate(&self, token: &str) -> bool;
}

/// Accepts exactly one configured shared secret
pub struct StaticTokenValidator {
    token: String,
}

impl StaticTokenValidator {
    /// Create a validator for `token`
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenValidator for StaticTokenValidator {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn validate(&self, token: &str) -> bool {
        !token.is_empty() && !self.token.is_empty() && constant_time_eq(token, &self.token)
    }
}

/// Accepts live access tokens from the token store
pub struct OAuthTokenValidator {
    tokens: Arc<TokenStore>,
}

impl OAuthTokenValidator {
    /// Create a validator backed by `tokens`
    #[must_use]
    pub const fn new(tokens: Arc<TokenStore>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl TokenValidator for OAuthTokenValidator {
    fn name(&self) -> &'static str {
        "oauth"
    }

    async fn validate(&self, token: &str) -> bool {
        self.tokens.validate(token, TokenKind::Access).await.is_some()
    }
}

/// Accepts a token if any inner validator does
#[derive(Default)]
pub struct MultiValidator {
    validators: Vec<Arc<dyn TokenValidator>>,
}

impl MultiValidator {
    /// Create an empty validator that rejects everything
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a validator
    #[must_use]
    pub fn with(mut self, validator: Arc<dyn TokenValidator>) -> Self {
        self.validators.push(validator);
        self
    }

    /// Name of the first validator accepting `token`
    pub async fn accepting(&self, token: &str) -> Option<&'static str> {
        for validator in &self.validators {
            if validator.validate(token).await {
                return Some(validator.name());
            }
        }
        None
    }
}

#[async_trait]
impl TokenValidator for MultiValidator {
    fn name(&self) -> &'static str {
        "multi"
    }

    async fn validate(&self, token: &str) -> bool {
        self.accepting(token).await.is_some()
    }
}

/// Shared state of the bearer middleware
pub struct BearerAuth {
    validator: MultiValidator,
    resource_metadata_url: Option<String>,
}

impl BearerAuth {
    /// Create the middleware state
    #[must_use]
    pub const fn new(validator: MultiValidator, resource_metadata_url: Option<String>) -> Self {
        Self {
            validator,
            resource_metadata_url,
        }
    }

    /// Check the `Authorization` header
    ///
    /// # Errors
    ///
    /// Returns an auth error for a missing, malformed or rejected bearer token
    #[tracing::instrument(
        skip(self, headers),
        fields(auth_method = tracing::field::Empty, success = tracing::field::Empty)
    )]
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<&'static str, AppError> {
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(AppError::auth_required)?;

        if let Some(method) = self.validator.accepting(token).await {
            tracing::Span::current()
                .record("auth_method", method)
                .record("success", true);
            Ok(method)
        } else {
            tracing::Span::current().record("success", false);
            tracing::debug!("bearer token rejected by all validators");
            Err(AppError::auth_invalid("invalid token"))
        }
    }

    /// Build the `WWW-Authenticate` challenge for a failed request
    #[must_use]
    pub fn challenge(&self, error_description: &str) -> String {
        let mut params = Vec::with_capacity(3);
        if let Some(url) = &self.resource_metadata_url {
            params.push(format!(r#"resource_metadata="{url}""#));
        }
        params.push(r#"error="invalid_token""#.to_owned());
        params.push(format!(r#"error_description="{error_description}""#));
        format!("Bearer {}", params.join(", "))
    }
}

/// Axum middleware guarding protected routes
pub async fn require_bearer(
    State(auth): State<Arc<BearerAuth>>,
    request: Request,
    next: Next,
) -> Response {
    match auth.authenticate(request.headers()).await {
        Ok(_) => next.run(request).await,
        Err(error) => {
            let description = match error.code {
                ErrorCode::AuthRequired => "missing or invalid authorization header",
                _ => "invalid token",
            };
            let challenge = auth.challenge(description);
            let mut response = error.into_response();
            if let Ok(value) = HeaderValue::from_str(&challenge) {
                response.headers_mut().insert(WWW_AUTHENTICATE, value);
            }
            response
        }
    }
}
