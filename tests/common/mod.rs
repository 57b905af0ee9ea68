// ABOUTME: Shared test setup for the authorization core integration tests
// ABOUTME: Builds configured routers, PKCE pairs and drives the authorize and token endpoints

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;

use axum::Router;
use momentum_mcp_server::config::ServerConfig;
use momentum_mcp_server::oauth2_server::tokens::s256_challenge;
use momentum_mcp_server::server::{build_router, AuthorizationCore};
use serde_json::Value;
use url::Url;

use crate::helpers::axum_test::AxumTestRequest;

pub const BASE_URL: &str = "https://mcp.example.test";
pub const REDIRECT_URI: &str = "http://localhost:9000/callback";
pub const VERIFIER: &str = "dBjftJeZ4CVP-mJ92pu5j8YnHAHuMgt3OGnnKR2lSmQdemoverifier";

/// Build a configuration from explicit variables, starting from a fixed base URL
pub fn test_config(extra: &[(&str, &str)]) -> ServerConfig {
    let mut vars: HashMap<String, String> = HashMap::new();
    vars.insert("BASE_URL".to_owned(), BASE_URL.to_owned());
    for (k, v) in extra {
        vars.insert((*k).to_owned(), (*v).to_owned());
    }
    ServerConfig::from_lookup(|key| vars.get(key).cloned()).expect("valid test config")
}

/// Configuration persisting into `dir`
pub fn persistent_config(dir: &Path, extra: &[(&str, &str)]) -> ServerConfig {
    let dir = dir.to_string_lossy().into_owned();
    let mut vars: Vec<(&str, &str)> = vec![("DATA_DIR", dir.as_str())];
    vars.extend_from_slice(extra);
    test_config(&vars)
}

/// Core plus router for `config`
pub fn app(config: &ServerConfig) -> (AuthorizationCore, Router) {
    let core = AuthorizationCore::new(config);
    let router = build_router(&core, config);
    (core, router)
}

/// Query string for a valid authorization request
pub fn authorize_query(client_id: &str, redirect_uri: &str, state: &str) -> String {
    let challenge = s256_challenge(VERIFIER);
    serde_urlencoded::to_string([
        ("client_id", client_id),
        ("redirect_uri", redirect_uri),
        ("response_type", "code"),
        ("state", state),
        ("code_challenge", challenge.as_str()),
        ("code_challenge_method", "S256"),
    ])
    .unwrap()
}

/// Register a public client with one redirect URI and return its id
pub async fn register_client(router: &Router, redirect_uri: &str) -> String {
    let body: Value = AxumTestRequest::post("/register")
        .json(&serde_json::json!({
            "client_name": "Test Client",
            "redirect_uris": [redirect_uri],
        }))
        .send(router.clone())
        .await
        .json();
    body["client_id"].as_str().unwrap().to_owned()
}

/// Query parameters of a redirect `Location`
pub fn redirect_params(location: &str) -> HashMap<String, String> {
    Url::parse(location)
        .unwrap()
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Run an auto-approved authorization and return the issued code
pub async fn obtain_code(router: &Router, client_id: &str) -> String {
    let response = AxumTestRequest::get(&format!(
        "/authorize?{}",
        authorize_query(client_id, REDIRECT_URI, "st")
    ))
    .send(router.clone())
    .await;
    assert_eq!(response.status(), 302);
    let location = response.header("location").unwrap();
    redirect_params(&location).remove("code").unwrap()
}

/// Exchange `code` at the token endpoint
pub async fn exchange_code(router: &Router, client_id: &str, code: &str) -> (u16, Value) {
    let response = AxumTestRequest::post("/token")
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("code_verifier", VERIFIER),
            ("client_id", client_id),
            ("redirect_uri", REDIRECT_URI),
        ])
        .send(router.clone())
        .await;
    let status = response.status();
    (status, response.json())
}

/// Redeem `refresh_token` at the token endpoint
pub async fn refresh(router: &Router, client_id: &str, refresh_token: &str) -> (u16, Value) {
    let response = AxumTestRequest::post("/token")
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", client_id),
        ])
        .send(router.clone())
        .await;
    let status = response.status();
    (status, response.json())
}

/// Call the protected ping method with `token`
pub async fn mcp_ping(router: &Router, token: &str) -> u16 {
    AxumTestRequest::post("/mcp")
        .bearer(token)
        .json(&serde_json::json!({ "jsonrpc": "2.0", "id": 1, "method": "ping" }))
        .send(router.clone())
        .await
        .status()
}
