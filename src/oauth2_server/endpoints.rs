// ABOUTME: OAuth 2.0 authorization server protocol logic for discovery, authorize, token and register
// ABOUTME: Framework-independent; HTTP adapters live in oauth2_server::routes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Momentum MCP Server Authors

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{error, warn};

use super::auth_codes::AuthCodeStore;
use super::client_registration::ClientStore;
use super::consent::render_consent_page;
use super::models::{
    AuthorizationCode, AuthorizationServerMetadata, AuthorizeRequest, ClientRecord,
    ClientRegistrationRequest, ClientRegistrationResponse, ConsentForm, OAuth2Error,
    ProtectedResourceMetadata, TokenRequest, TokenResponse,
};
use super::persistence::PersistenceManager;
use super::token_store::{RefreshRejection, TokenStore};
use super::tokens::{constant_time_eq, generate_token, verify_pkce};
use crate::constants::{lifetimes, oauth, paths};
use crate::logging::log_auth_event;

/// Result of an authorization endpoint call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizeOutcome {
    /// Send the user agent to this URL with a 302
    Redirect(String),
    /// Show this consent page with a 200
    Consent(String),
}

/// OAuth 2.0 Authorization Server
pub struct OAuth2AuthorizationServer {
    base_url: String,
    authorize_pin: Option<String>,
    tokens: Arc<TokenStore>,
    codes: Arc<AuthCodeStore>,
    clients: Arc<ClientStore>,
    persistence: Arc<PersistenceManager>,
}

impl OAuth2AuthorizationServer {
    /// Wire the server to its stores
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        authorize_pin: Option<String>,
        tokens: Arc<TokenStore>,
        codes: Arc<AuthCodeStore>,
        clients: Arc<ClientStore>,
        persistence: Arc<PersistenceManager>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            authorize_pin: authorize_pin.filter(|pin| !pin.is_empty()),
            tokens,
            codes,
            clients,
            persistence,
        }
    }

    /// RFC 9728 protected resource metadata
    #[must_use]
    pub fn protected_resource_metadata(&self) -> ProtectedResourceMetadata {
        ProtectedResourceMetadata {
            resource: self.base_url.clone(),
            authorization_servers: vec![self.base_url.clone()],
            scopes_supported: owned(&oauth::SCOPES_SUPPORTED),
            bearer_methods_supported: vec!["header".to_owned()],
        }
    }

    /// RFC 8414 authorization server metadata
    #[must_use]
    pub fn authorization_server_metadata(&self) -> AuthorizationServerMetadata {
        AuthorizationServerMetadata {
            issuer: self.base_url.clone(),
            authorization_endpoint: format!("{}{}", self.base_url, paths::AUTHORIZE),
            token_endpoint: format!("{}{}", self.base_url, paths::TOKEN),
            registration_endpoint: format!("{}{}", self.base_url, paths::REGISTER),
            response_types_supported: vec![oauth::RESPONSE_TYPE_CODE.to_owned()],
            grant_types_supported: supported_grant_types(),
            code_challenge_methods_supported: vec![oauth::PKCE_METHOD_S256.to_owned()],
            token_endpoint_auth_methods_supported: vec![oauth::AUTH_METHOD_NONE.to_owned()],
            scopes_supported: owned(&oauth::SCOPES_SUPPORTED),
            service_documentation: oauth::SERVICE_DOCUMENTATION.to_owned(),
        }
    }

    /// Handle `GET /authorize`
    ///
    /// # Errors
    ///
    /// Returns an OAuth error for missing parameters, an unsupported response type,
    /// missing or non-S256 PKCE, or an unregistered redirect URI
    pub async fn authorize(
        &self,
        request: &AuthorizeRequest,
    ) -> Result<AuthorizeOutcome, OAuth2Error> {
        let client = self.validate_flow(request).await?;

        if self.authorize_pin.is_none() {
            log_auth_event("authorize_auto_approved", &client.client_id, "no PIN configured");
            return self.issue_code(request).await.map(AuthorizeOutcome::Redirect);
        }

        Ok(AuthorizeOutcome::Consent(render_consent_page(
            client.display_name(),
            request,
            None,
        )))
    }

    /// Handle `POST /authorize` from the consent page
    ///
    /// # Errors
    ///
    /// Returns an OAuth error if the carried flow parameters no longer validate or
    /// the action is unknown
    pub async fn authorize_decision(
        &self,
        form: &ConsentForm,
    ) -> Result<AuthorizeOutcome, OAuth2Error> {
        let request = &form.request;
        let client = self.validate_flow(request).await?;

        match form.action.as_str() {
            "deny" => {
                log_auth_event("authorize_denied", &client.client_id, "user denied access");
                Ok(AuthorizeOutcome::Redirect(error_redirect(
                    &request.redirect_uri,
                    "access_denied",
                    "User denied the request",
                    &request.state,
                )))
            }
            "approve" => {
                if let Some(expected) = &self.authorize_pin {
                    if !constant_time_eq(&form.pin, expected) {
                        log_auth_event("authorize_pin_rejected", &client.client_id, "invalid PIN");
                        return Ok(AuthorizeOutcome::Consent(render_consent_page(
                            client.display_name(),
                            request,
                            Some("Invalid PIN"),
                        )));
                    }
                }
                log_auth_event("authorize_approved", &client.client_id, "user approved access");
                self.issue_code(request).await.map(AuthorizeOutcome::Redirect)
            }
            _ => Err(OAuth2Error::invalid_request("action must be approve or deny")),
        }
    }

    /// Handle `POST /token`
    ///
    /// # Errors
    ///
    /// Returns an OAuth error for unsupported grants, missing parameters or any
    /// failed code, client, redirect, PKCE or refresh token check
    pub async fn token(&self, request: &TokenRequest) -> Result<TokenResponse, OAuth2Error> {
        match request.grant_type.as_str() {
            oauth::GRANT_AUTHORIZATION_CODE => self.exchange_code(request).await,
            oauth::GRANT_REFRESH_TOKEN => self.rotate_refresh(request).await,
            _ => Err(OAuth2Error::unsupported_grant_type()),
        }
    }

    /// Handle `POST /register`
    ///
    /// # Errors
    ///
    /// Returns `invalid_redirect_uri` or `invalid_client_metadata` for unacceptable
    /// requests, and `server_error` if the random source fails
    pub async fn register(
        &self,
        request: ClientRegistrationRequest,
    ) -> Result<ClientRegistrationResponse, OAuth2Error> {
        let client = self.clients.register_dynamic(request).await?;
        log_auth_event("client_registered", &client.client_id, "dynamic registration");
        self.persistence.trigger_save();

        Ok(ClientRegistrationResponse {
            client_id: client.client_id,
            client_name: client.client_name,
            redirect_uris: client.redirect_uris,
            grant_types: supported_grant_types(),
            response_types: vec![oauth::RESPONSE_TYPE_CODE.to_owned()],
            token_endpoint_auth_method: oauth::AUTH_METHOD_NONE.to_owned(),
            client_id_issued_at: client.created_at.timestamp(),
        })
    }

    async fn validate_flow(&self, request: &AuthorizeRequest) -> Result<ClientRecord, OAuth2Error> {
        if request.client_id.is_empty()
            || request.redirect_uri.is_empty()
            || request.response_type.is_empty()
        {
            return Err(OAuth2Error::invalid_request("Missing required parameters"));
        }

        if request.response_type != oauth::RESPONSE_TYPE_CODE {
            return Err(OAuth2Error::unsupported_response_type());
        }

        if request.code_challenge.is_empty()
            || request.code_challenge_method != oauth::PKCE_METHOD_S256
        {
            return Err(OAuth2Error::invalid_request("PKCE with S256 is required"));
        }

        let Some(client) = self.clients.get(&request.client_id).await else {
            warn!(client_id = %request.client_id, "authorize request for unknown client");
            return Err(OAuth2Error::invalid_request("Unknown client_id"));
        };

        if !self
            .clients
            .validate_redirect_uri(&request.client_id, &request.redirect_uri)
            .await
        {
            log_auth_event("authorize_failed", &client.client_id, "redirect URI not registered");
            return Err(OAuth2Error::invalid_request(
                "Invalid redirect_uri for client",
            ));
        }

        Ok(client)
    }

    async fn issue_code(&self, request: &AuthorizeRequest) -> Result<String, OAuth2Error> {
        let code = generate_token()?;
        self.codes
            .store(AuthorizationCode {
                code: code.clone(),
                client_id: request.client_id.clone(),
                redirect_uri: request.redirect_uri.clone(),
                code_challenge: request.code_challenge.clone(),
                code_challenge_method: request.code_challenge_method.clone(),
                expires_at: Utc::now() + Duration::seconds(lifetimes::AUTHORIZATION_CODE_TTL_SECS),
                used: false,
            })
            .await;
        log_auth_event("code_issued", &request.client_id, "authorization code issued");

        let mut params = vec![("code", code.as_str())];
        if !request.state.is_empty() {
            params.push(("state", request.state.as_str()));
        }
        Ok(append_query(&request.redirect_uri, &params))
    }

    async fn exchange_code(&self, request: &TokenRequest) -> Result<TokenResponse, OAuth2Error> {
        if request.code.is_empty()
            || request.code_verifier.is_empty()
            || request.client_id.is_empty()
            || request.redirect_uri.is_empty()
        {
            return Err(OAuth2Error::invalid_request("Missing required parameters"));
        }

        let client_id = request.client_id.as_str();
        let Some(code) = self.codes.get(&request.code).await else {
            log_auth_event("token_failed", client_id, "invalid or expired code");
            return Err(OAuth2Error::invalid_grant(
                "Invalid or expired authorization code",
            ));
        };

        if code.client_id != request.client_id {
            log_auth_event("token_failed", client_id, "client ID mismatch");
            return Err(OAuth2Error::invalid_grant("Client ID mismatch"));
        }

        if code.redirect_uri != request.redirect_uri {
            log_auth_event("token_failed", client_id, "redirect URI mismatch");
            return Err(OAuth2Error::invalid_grant("Redirect URI mismatch"));
        }

        if !verify_pkce(
            &request.code_verifier,
            &code.code_challenge,
            &code.code_challenge_method,
        ) {
            log_auth_event("token_failed", client_id, "PKCE verification failed");
            return Err(OAuth2Error::invalid_grant("Invalid code_verifier"));
        }

        let response = self.issue_tokens(&code.client_id).await?;
        log_auth_event("tokens_issued", client_id, "authorization code exchanged");
        Ok(response)
    }

    async fn rotate_refresh(&self, request: &TokenRequest) -> Result<TokenResponse, OAuth2Error> {
        if request.refresh_token.is_empty() {
            return Err(OAuth2Error::invalid_request("Missing refresh_token"));
        }

        let supplied_client = Some(request.client_id.as_str()).filter(|id| !id.is_empty());
        let record = match self
            .tokens
            .redeem_refresh(&request.refresh_token, supplied_client)
            .await
        {
            Ok(record) => record,
            Err(RefreshRejection::Invalid) => {
                log_auth_event(
                    "refresh_failed",
                    supplied_client.unwrap_or("-"),
                    "invalid or expired refresh token",
                );
                return Err(OAuth2Error::invalid_grant(
                    "Invalid or expired refresh token",
                ));
            }
            Err(RefreshRejection::ClientMismatch) => {
                log_auth_event(
                    "refresh_failed",
                    supplied_client.unwrap_or("-"),
                    "client ID mismatch",
                );
                return Err(OAuth2Error::invalid_grant("Client ID mismatch"));
            }
        };

        let response = self.issue_tokens(&record.client_id).await?;
        log_auth_event("tokens_rotated", &record.client_id, "refresh token rotated");
        Ok(response)
    }

    /// Issue a refresh token, then an access token linked to it
    async fn issue_tokens(&self, client_id: &str) -> Result<TokenResponse, OAuth2Error> {
        let (refresh_token, _) = self.tokens.issue_refresh(client_id).await?;
        let access_token = match self
            .tokens
            .issue_access(client_id, Some(&refresh_token))
            .await
        {
            Ok((token, _)) => token,
            Err(e) => {
                error!(client_id, "access token issuance failed: {e}");
                self.tokens.revoke(&refresh_token).await;
                return Err(OAuth2Error::server_error());
            }
        };
        self.persistence.trigger_save();

        Ok(TokenResponse {
            access_token,
            token_type: oauth::TOKEN_TYPE_BEARER.to_owned(),
            expires_in: self.tokens.access_ttl_secs(),
            refresh_token,
            scope: oauth::GRANTED_SCOPE.to_owned(),
        })
    }
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_owned()).collect()
}

fn supported_grant_types() -> Vec<String> {
    owned(&[oauth::GRANT_AUTHORIZATION_CODE, oauth::GRANT_REFRESH_TOKEN])
}

/// Append percent-encoded query parameters to a redirect URI
fn append_query(base: &str, params: &[(&str, &str)]) -> String {
    let mut url = base.to_owned();
    let mut separator = if base.contains('?') { '&' } else { '?' };
    for (key, value) in params {
        url.push(separator);
        url.push_str(key);
        url.push('=');
        url.push_str(&urlencoding::encode(value));
        separator = '&';
    }
    url
}

fn error_redirect(redirect_uri: &str, error: &str, description: &str, state: &str) -> String {
    let mut params = vec![("error", error), ("error_description", description)];
    if !state.is_empty() {
        params.push(("state", state));
    }
    append_query(redirect_uri, &params)
}
