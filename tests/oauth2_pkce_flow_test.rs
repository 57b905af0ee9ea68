// ABOUTME: End-to-end tests of the OAuth authorization code flow through the full router
// ABOUTME: Covers discovery, registration, consent, code exchange, refresh rotation and the bearer gate
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Momentum MCP Server Authors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;
mod helpers;

use common::{REDIRECT_URI, VERIFIER};
use helpers::axum_test::AxumTestRequest;
use momentum_mcp_server::oauth2_server::tokens::s256_challenge;
use serde_json::{json, Value};

#[tokio::test]
async fn test_discovery_documents() {
    let config = common::test_config(&[]);
    let (_core, router) = common::app(&config);

    let resource: Value = AxumTestRequest::get("/.well-known/oauth-protected-resource")
        .send(router.clone())
        .await
        .json();
    assert_eq!(resource["resource"], common::BASE_URL);
    assert_eq!(resource["authorization_servers"], json!([common::BASE_URL]));
    assert_eq!(resource["bearer_methods_supported"], json!(["header"]));

    let server: Value = AxumTestRequest::get("/.well-known/oauth-authorization-server")
        .send(router.clone())
        .await
        .json();
    assert_eq!(server["issuer"], common::BASE_URL);
    assert_eq!(
        server["authorization_endpoint"],
        format!("{}/authorize", common::BASE_URL)
    );
    assert_eq!(server["token_endpoint"], format!("{}/token", common::BASE_URL));
    assert_eq!(
        server["registration_endpoint"],
        format!("{}/register", common::BASE_URL)
    );
    assert_eq!(server["code_challenge_methods_supported"], json!(["S256"]));
    assert_eq!(
        server["service_documentation"],
        "https://github.com/dang-w/momentum-mcp-server"
    );
    assert_eq!(server["token_endpoint_auth_methods_supported"], json!(["none"]));
    assert_eq!(
        server["grant_types_supported"],
        json!(["authorization_code", "refresh_token"])
    );
}

#[tokio::test]
async fn test_full_flow_grants_access_to_protected_endpoint() {
    let config = common::test_config(&[]);
    let (_core, router) = common::app(&config);

    let client_id = common::register_client(&router, REDIRECT_URI).await;
    assert_eq!(client_id.len(), 16);

    let response = AxumTestRequest::get(&format!(
        "/authorize?{}",
        common::authorize_query(&client_id, REDIRECT_URI, "xyz")
    ))
    .send(router.clone())
    .await;
    assert_eq!(response.status(), 302);
    let location = response.header("location").unwrap();
    assert!(location.starts_with(REDIRECT_URI));
    let params = common::redirect_params(&location);
    assert_eq!(params["state"], "xyz");
    let code = params["code"].clone();

    let token_response = AxumTestRequest::post("/token")
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("code_verifier", VERIFIER),
            ("client_id", client_id.as_str()),
            ("redirect_uri", REDIRECT_URI),
        ])
        .send(router.clone())
        .await;
    assert_eq!(token_response.status(), 200);
    assert_eq!(
        token_response.header("cache-control").as_deref(),
        Some("no-store")
    );
    let tokens: Value = token_response.json();
    assert_eq!(tokens["token_type"], "Bearer");
    assert_eq!(tokens["expires_in"], 3600);
    assert_eq!(tokens["scope"], "mcp:read mcp:write");
    let access = tokens["access_token"].as_str().unwrap();
    assert!(tokens["refresh_token"].as_str().is_some());

    assert_eq!(common::mcp_ping(&router, access).await, 200);

    // The code is single-use
    let (status, body) = common::exchange_code(&router, &client_id, &code).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "invalid_grant");
}

#[tokio::test]
async fn test_bearer_gate_rejects_with_challenge() {
    let config = common::test_config(&[("AUTH_TOKEN", "shared-secret")]);
    let (_core, router) = common::app(&config);

    let missing = AxumTestRequest::post("/mcp")
        .json(&json!({ "jsonrpc": "2.0", "id": 1, "method": "ping" }))
        .send(router.clone())
        .await;
    assert_eq!(missing.status(), 401);
    let challenge = missing.header("www-authenticate").unwrap();
    assert!(challenge.starts_with("Bearer "));
    assert!(challenge.contains(&format!(
        r#"resource_metadata="{}/.well-known/oauth-protected-resource""#,
        common::BASE_URL
    )));
    assert!(challenge.contains(r#"error="invalid_token""#));

    assert_eq!(common::mcp_ping(&router, "unknown-token").await, 401);
    assert_eq!(common::mcp_ping(&router, "shared-secret").await, 200);

    // The root path is protected the same way
    let root = AxumTestRequest::post("/")
        .json(&json!({ "jsonrpc": "2.0", "id": 1, "method": "ping" }))
        .send(router.clone())
        .await;
    assert_eq!(root.status(), 401);

    let health: Value = AxumTestRequest::get("/health")
        .send(router.clone())
        .await
        .json();
    assert_eq!(health["status"], "ok");
}

#[tokio::test]
async fn test_authorize_rejects_bad_requests_without_redirect() {
    let config = common::test_config(&[]);
    let (_core, router) = common::app(&config);
    let client_id = common::register_client(&router, REDIRECT_URI).await;

    let unregistered = AxumTestRequest::get(&format!(
        "/authorize?{}",
        common::authorize_query(&client_id, "http://localhost:9000/other", "s")
    ))
    .send(router.clone())
    .await;
    assert_eq!(unregistered.status(), 400);
    assert!(unregistered.header("location").is_none());
    let body: Value = unregistered.json();
    assert_eq!(body["error"], "invalid_request");

    let unknown_client = AxumTestRequest::get(&format!(
        "/authorize?{}",
        common::authorize_query("nobody", REDIRECT_URI, "s")
    ))
    .send(router.clone())
    .await;
    assert_eq!(unknown_client.status(), 400);

    let challenge = s256_challenge(VERIFIER);
    let plain_pkce = serde_urlencoded::to_string([
        ("client_id", client_id.as_str()),
        ("redirect_uri", REDIRECT_URI),
        ("response_type", "code"),
        ("code_challenge", challenge.as_str()),
        ("code_challenge_method", "plain"),
    ])
    .unwrap();
    let response = AxumTestRequest::get(&format!("/authorize?{plain_pkce}"))
        .send(router.clone())
        .await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json();
    assert_eq!(body["error"], "invalid_request");

    let token_flow = serde_urlencoded::to_string([
        ("client_id", client_id.as_str()),
        ("redirect_uri", REDIRECT_URI),
        ("response_type", "token"),
        ("code_challenge", challenge.as_str()),
        ("code_challenge_method", "S256"),
    ])
    .unwrap();
    let response = AxumTestRequest::get(&format!("/authorize?{token_flow}"))
        .send(router.clone())
        .await;
    let body: Value = response.json();
    assert_eq!(body["error"], "unsupported_response_type");
}

#[tokio::test]
async fn test_token_exchange_checks_binding() {
    let config = common::test_config(&[]);
    let (_core, router) = common::app(&config);
    let client_id = common::register_client(&router, REDIRECT_URI).await;

    let code = common::obtain_code(&router, &client_id).await;
    let response = AxumTestRequest::post("/token")
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("code_verifier", "a-completely-different-verifier-value-of-decent-length"),
            ("client_id", client_id.as_str()),
            ("redirect_uri", REDIRECT_URI),
        ])
        .send(router.clone())
        .await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json();
    assert_eq!(body["error"], "invalid_grant");

    // A failed exchange still consumes the code
    let (status, _) = common::exchange_code(&router, &client_id, &code).await;
    assert_eq!(status, 400);

    let code = common::obtain_code(&router, &client_id).await;
    let (status, body) = common::exchange_code(&router, "someone-else", &code).await;
    assert_eq!(status, 400);
    assert_eq!(body["error_description"], "Client ID mismatch");

    let missing = AxumTestRequest::post("/token")
        .form(&[("grant_type", "authorization_code")])
        .send(router.clone())
        .await;
    let body: Value = missing.json();
    assert_eq!(body["error"], "invalid_request");

    let unsupported = AxumTestRequest::post("/token")
        .form(&[("grant_type", "client_credentials")])
        .send(router.clone())
        .await;
    assert_eq!(unsupported.status(), 400);
    assert_eq!(
        unsupported.header("cache-control").as_deref(),
        Some("no-store")
    );
    let body: Value = unsupported.json();
    assert_eq!(body["error"], "unsupported_grant_type");
}

#[tokio::test]
async fn test_refresh_rotation_revokes_previous_pair() {
    let config = common::test_config(&[]);
    let (_core, router) = common::app(&config);
    let client_id = common::register_client(&router, REDIRECT_URI).await;
    let code = common::obtain_code(&router, &client_id).await;
    let (_, first) = common::exchange_code(&router, &client_id, &code).await;
    let access_1 = first["access_token"].as_str().unwrap();
    let refresh_1 = first["refresh_token"].as_str().unwrap();

    let (status, second) = common::refresh(&router, &client_id, refresh_1).await;
    assert_eq!(status, 200);
    let access_2 = second["access_token"].as_str().unwrap();
    let refresh_2 = second["refresh_token"].as_str().unwrap();
    assert_ne!(refresh_1, refresh_2);

    assert_eq!(common::mcp_ping(&router, access_1).await, 401);
    assert_eq!(common::mcp_ping(&router, access_2).await, 200);

    let (status, body) = common::refresh(&router, &client_id, refresh_1).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "invalid_grant");

    // A different client cannot rotate, and the token stays usable for its owner
    let (status, body) = common::refresh(&router, "intruder", refresh_2).await;
    assert_eq!(status, 400);
    assert_eq!(body["error_description"], "Client ID mismatch");
    let (status, _) = common::refresh(&router, &client_id, refresh_2).await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn test_pin_consent_flow() {
    let config = common::test_config(&[("OAUTH_AUTHORIZE_PIN", "4321")]);
    let (_core, router) = common::app(&config);
    let client_id = common::register_client(&router, REDIRECT_URI).await;

    let page = AxumTestRequest::get(&format!(
        "/authorize?{}",
        common::authorize_query(&client_id, REDIRECT_URI, "st<1>")
    ))
    .send(router.clone())
    .await;
    assert_eq!(page.status(), 200);
    assert!(page.header("location").is_none());
    let html = page.text();
    assert!(html.contains("Test Client"));
    assert!(html.contains("st&lt;1&gt;"));
    assert!(!html.contains("st<1>"));

    let challenge = s256_challenge(VERIFIER);
    let consent = |pin: &'static str, action: &'static str| {
        let challenge = challenge.clone();
        let client_id = client_id.clone();
        AxumTestRequest::post("/authorize").form(&[
            ("client_id", client_id),
            ("redirect_uri", REDIRECT_URI.to_owned()),
            ("response_type", "code".to_owned()),
            ("state", "st<1>".to_owned()),
            ("code_challenge", challenge),
            ("code_challenge_method", "S256".to_owned()),
            ("pin", pin.to_owned()),
            ("action", action.to_owned()),
        ])
    };

    let wrong = consent("0000", "approve").send(router.clone()).await;
    assert_eq!(wrong.status(), 200);
    assert!(wrong.text().contains("Invalid PIN"));

    let denied = consent("", "deny").send(router.clone()).await;
    assert_eq!(denied.status(), 302);
    let params = common::redirect_params(&denied.header("location").unwrap());
    assert_eq!(params["error"], "access_denied");
    assert_eq!(params["state"], "st<1>");

    let approved = consent("4321", "approve").send(router.clone()).await;
    assert_eq!(approved.status(), 302);
    let params = common::redirect_params(&approved.header("location").unwrap());
    assert_eq!(params["state"], "st<1>");
    let (status, _) = common::exchange_code(&router, &client_id, &params["code"]).await;
    assert_eq!(status, 200);

    let bogus = consent("4321", "maybe").send(router.clone()).await;
    assert_eq!(bogus.status(), 400);
}

#[tokio::test]
async fn test_registration_validation() {
    let config = common::test_config(&[]);
    let (_core, router) = common::app(&config);

    let response = AxumTestRequest::post("/register")
        .json(&json!({
            "client_name": "Notes",
            "redirect_uris": ["https://notes.example/cb", "com.example.notes:/oauth"],
        }))
        .send(router.clone())
        .await;
    assert_eq!(response.status(), 201);
    let body: Value = response.json();
    assert_eq!(body["client_name"], "Notes");
    assert_eq!(body["token_endpoint_auth_method"], "none");
    assert_eq!(body["response_types"], json!(["code"]));
    assert!(body["client_id_issued_at"].as_i64().unwrap() > 0);

    let empty = AxumTestRequest::post("/register")
        .json(&json!({ "redirect_uris": [] }))
        .send(router.clone())
        .await;
    assert_eq!(empty.status(), 400);
    let body: Value = empty.json();
    assert_eq!(body["error"], "invalid_redirect_uri");

    for uri in [
        "http://evil.example/cb",
        "https://notes.example/cb#frag",
        "https://*.example/cb",
        "not a uri",
    ] {
        let response = AxumTestRequest::post("/register")
            .json(&json!({ "redirect_uris": [uri] }))
            .send(router.clone())
            .await;
        assert_eq!(response.status(), 400, "{uri} should be rejected");
    }

    let malformed = AxumTestRequest::post("/register")
        .raw("application/json", "{ nope")
        .send(router.clone())
        .await;
    assert_eq!(malformed.status(), 400);
    let body: Value = malformed.json();
    assert_eq!(body["error"], "invalid_client_metadata");
}

#[tokio::test]
async fn test_seeded_client_is_available() {
    let config = common::test_config(&[]);
    let (_core, router) = common::app(&config);

    let response = AxumTestRequest::get(&format!(
        "/authorize?{}",
        common::authorize_query(
            "claude-ai",
            "https://claude.ai/api/mcp/auth_callback",
            "s"
        )
    ))
    .send(router.clone())
    .await;
    assert_eq!(response.status(), 302);
    let location = response.header("location").unwrap();
    assert!(location.starts_with("https://claude.ai/api/mcp/auth_callback?code="));
}

#[tokio::test]
async fn test_mcp_protocol_methods() {
    let config = common::test_config(&[("AUTH_TOKEN", "shared-secret")]);
    let (_core, router) = common::app(&config);

    let init: Value = AxumTestRequest::post("/mcp")
        .bearer("shared-secret")
        .json(&json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {} }))
        .send(router.clone())
        .await
        .json();
    assert_eq!(init["result"]["protocolVersion"], "2025-06-18");

    let notification = AxumTestRequest::post("/mcp")
        .bearer("shared-secret")
        .json(&json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }))
        .send(router.clone())
        .await;
    assert_eq!(notification.status(), 202);

    let parse_error: Value = AxumTestRequest::post("/mcp")
        .bearer("shared-secret")
        .raw("application/json", "{")
        .send(router.clone())
        .await
        .json();
    assert_eq!(parse_error["error"]["code"], -32700);
}

#[tokio::test]
async fn test_code_is_never_issued_to_foreign_redirect() {
    let config = common::test_config(&[]);
    let (core, router) = common::app(&config);
    let client_id = common::register_client(&router, "https://app.example/cb").await;

    let response = AxumTestRequest::get(&format!(
        "/authorize?{}",
        common::authorize_query(&client_id, "https://evil.example/cb", "s")
    ))
    .send(router.clone())
    .await;
    assert_eq!(response.status(), 400);
    assert!(core.codes.is_empty().await);

    let response = AxumTestRequest::get(&format!(
        "/authorize?{}",
        common::authorize_query(&client_id, "https://app.example/cb", "s")
    ))
    .send(router.clone())
    .await;
    assert_eq!(response.status(), 302);
    assert!(response
        .header("location")
        .unwrap()
        .starts_with("https://app.example/cb?code="));
    assert_eq!(core.codes.len().await, 1);
}
