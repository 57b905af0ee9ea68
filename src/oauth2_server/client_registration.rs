// ABOUTME: OAuth 2.0 client registry with the seeded well-known client and dynamic registration (RFC 7591)
// ABOUTME: Provides exact-match redirect URI validation used by the authorization endpoint
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Momentum MCP Server Authors

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::warn;
use url::Url;

use super::models::{ClientRecord, ClientRegistrationRequest, OAuth2Error};
use super::tokens::generate_token;
use crate::constants::{oauth, seeded_client};

/// Registry of OAuth clients keyed by identifier
#[derive(Debug)]
pub struct ClientStore {
    clients: RwLock<HashMap<String, ClientRecord>>,
}

impl ClientStore {
    /// Create a store holding only the seeded client
    #[must_use]
    pub fn new() -> Self {
        let mut clients = HashMap::new();
        let seeded = Self::seeded_client();
        clients.insert(seeded.client_id.clone(), seeded);
        Self {
            clients: RwLock::new(clients),
        }
    }

    /// The pre-registered client recreated on every start
    #[must_use]
    pub fn seeded_client() -> ClientRecord {
        ClientRecord {
            client_id: seeded_client::CLIENT_ID.to_owned(),
            client_name: seeded_client::CLIENT_NAME.to_owned(),
            redirect_uris: seeded_client::REDIRECT_URIS
                .iter()
                .map(|uri| (*uri).to_owned())
                .collect(),
            created_at: Utc::now(),
        }
    }

    /// Whether `client_id` is the seeded client, which is never restored from a snapshot
    #[must_use]
    pub fn is_seeded(client_id: &str) -> bool {
        client_id == seeded_client::CLIENT_ID
    }

    /// Insert or overwrite a client by identifier
    pub async fn register(&self, client: ClientRecord) {
        self.clients
            .write()
            .await
            .insert(client.client_id.clone(), client);
    }

    /// Look up a client
    pub async fn get(&self, client_id: &str) -> Option<ClientRecord> {
        self.clients.read().await.get(client_id).cloned()
    }

    /// True iff the client exists and `uri` exactly matches one of its redirect URIs
    pub async fn validate_redirect_uri(&self, client_id: &str, uri: &str) -> bool {
        self.clients
            .read()
            .await
            .get(client_id)
            .is_some_and(|client| client.redirect_uris.iter().any(|r| r == uri))
    }

    /// Copy of every registered client
    pub async fn all(&self) -> HashMap<String, ClientRecord> {
        self.clients.read().await.clone()
    }

    /// Validate a registration request and create a new client from it
    ///
    /// The identifier is the first 16 characters of a fresh random token.
    ///
    /// # Errors
    ///
    /// Returns `invalid_redirect_uri` for missing or unacceptable redirect URIs and
    /// `server_error` if the random source fails
    pub async fn register_dynamic(
        &self,
        request: ClientRegistrationRequest,
    ) -> Result<ClientRecord, OAuth2Error> {
        validate_registration_request(&request)?;

        let mut client_id = generate_token()?;
        client_id.truncate(oauth::CLIENT_ID_LENGTH);

        let client = ClientRecord {
            client_id,
            client_name: request.client_name.unwrap_or_default(),
            redirect_uris: request.redirect_uris,
            created_at: Utc::now(),
        };
        self.register(client.clone()).await;
        Ok(client)
    }
}

impl Default for ClientStore {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_registration_request(request: &ClientRegistrationRequest) -> Result<(), OAuth2Error> {
    if request.redirect_uris.is_empty() {
        return Err(OAuth2Error::invalid_redirect_uri(
            "At least one redirect_uri is required",
        ));
    }

    if let Some(grant_types) = &request.grant_types {
        if let Some(unsupported) = grant_types.iter().find(|g| {
            !matches!(
                g.as_str(),
                oauth::GRANT_AUTHORIZATION_CODE | oauth::GRANT_REFRESH_TOKEN
            )
        }) {
            return Err(OAuth2Error::invalid_client_metadata(&format!(
                "Unsupported grant_type: {unsupported}"
            )));
        }
    }

    if request.redirect_uris.iter().all(|uri| is_valid_redirect_uri(uri)) {
        Ok(())
    } else {
        Err(OAuth2Error::invalid_redirect_uri(
            "redirect_uris must be absolute, without fragments or wildcards, and use https outside loopback",
        ))
    }
}

/// Check a redirect URI offered at registration
fn is_valid_redirect_uri(uri: &str) -> bool {
    if uri.trim().is_empty() || uri.contains('#') || uri.contains('*') {
        warn!("Rejected redirect_uri with empty value, fragment or wildcard");
        return false;
    }

    let Ok(parsed) = Url::parse(uri) else {
        warn!("Rejected malformed redirect_uri");
        return false;
    };

    match parsed.scheme() {
        "https" => true,
        "http" => {
            let loopback = matches!(
                parsed.host_str(),
                Some("localhost" | "127.0.0.1" | "[::1]")
            );
            if !loopback {
                warn!("Rejected http redirect_uri for non-loopback host");
            }
            loopback
        }
        // Custom schemes for native apps
        _ => true,
    }
}
