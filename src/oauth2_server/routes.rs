// ABOUTME: Axum route handlers for OAuth discovery, authorization, token and registration endpoints
// ABOUTME: Translates HTTP requests into OAuth2AuthorizationServer calls and shapes the responses
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Momentum MCP Server Authors

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::FormRejection;
use axum::extract::{Query, State};
use axum::http::header::{CACHE_CONTROL, LOCATION, PRAGMA};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};

use super::endpoints::{AuthorizeOutcome, OAuth2AuthorizationServer};
use super::models::{
    AuthorizeRequest, ClientRegistrationRequest, ConsentForm, OAuth2Error, TokenRequest,
};
use super::rate_limiting::SlidingWindowRateLimiter;
use crate::constants::paths;
use crate::middleware::rate_limiting::token_rate_limit;

/// OAuth routes implementation
pub struct OAuth2Routes;

impl OAuth2Routes {
    /// Create the discovery, authorize, token and register routes
    ///
    /// Only `POST /token` passes through the rate limiter.
    pub fn routes(
        server: Arc<OAuth2AuthorizationServer>,
        limiter: SlidingWindowRateLimiter,
    ) -> Router {
        let token_route = Router::new()
            .route(paths::TOKEN, post(handle_token))
            .route_layer(middleware::from_fn_with_state(limiter, token_rate_limit));

        Router::new()
            .route(
                paths::PROTECTED_RESOURCE_METADATA,
                get(handle_protected_resource_metadata),
            )
            .route(
                paths::AUTHORIZATION_SERVER_METADATA,
                get(handle_authorization_server_metadata),
            )
            .route(
                paths::AUTHORIZE,
                get(handle_authorize_get).post(handle_authorize_post),
            )
            .route(paths::REGISTER, post(handle_register))
            .merge(token_route)
            .with_state(server)
    }
}

async fn handle_protected_resource_metadata(
    State(server): State<Arc<OAuth2AuthorizationServer>>,
) -> impl IntoResponse {
    Json(server.protected_resource_metadata())
}

async fn handle_authorization_server_metadata(
    State(server): State<Arc<OAuth2AuthorizationServer>>,
) -> impl IntoResponse {
    Json(server.authorization_server_metadata())
}

async fn handle_authorize_get(
    State(server): State<Arc<OAuth2AuthorizationServer>>,
    Query(request): Query<AuthorizeRequest>,
) -> Response {
    match server.authorize(&request).await {
        Ok(outcome) => outcome_response(outcome),
        Err(error) => error.into_response(),
    }
}

async fn handle_authorize_post(
    State(server): State<Arc<OAuth2AuthorizationServer>>,
    form: Result<Form<ConsentForm>, FormRejection>,
) -> Response {
    let Ok(Form(form)) = form else {
        return OAuth2Error::invalid_request("Malformed form body").into_response();
    };
    match server.authorize_decision(&form).await {
        Ok(outcome) => outcome_response(outcome),
        Err(error) => error.into_response(),
    }
}

async fn handle_token(
    State(server): State<Arc<OAuth2AuthorizationServer>>,
    form: Result<Form<TokenRequest>, FormRejection>,
) -> Response {
    let result = match form {
        Ok(Form(request)) => server.token(&request).await,
        Err(_) => Err(OAuth2Error::invalid_request("Malformed form body")),
    };
    let mut response = match result {
        Ok(tokens) => Json(tokens).into_response(),
        Err(error) => error.into_response(),
    };
    // Token responses, successful or not, must never be cached
    let headers = response.headers_mut();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    response
}

async fn handle_register(
    State(server): State<Arc<OAuth2AuthorizationServer>>,
    body: Bytes,
) -> Response {
    let request: ClientRegistrationRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!("rejected registration body: {e}");
            return OAuth2Error::invalid_client_metadata("Invalid JSON body").into_response();
        }
    };

    match server.register(request).await {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(error) => error.into_response(),
    }
}

fn outcome_response(outcome: AuthorizeOutcome) -> Response {
    match outcome {
        AuthorizeOutcome::Redirect(location) => match HeaderValue::from_str(&location) {
            Ok(value) => (StatusCode::FOUND, [(LOCATION, value)]).into_response(),
            Err(_) => OAuth2Error::invalid_request("redirect_uri is not a valid header value")
                .into_response(),
        },
        AuthorizeOutcome::Consent(page) => (
            [(CACHE_CONTROL, HeaderValue::from_static("no-store"))],
            Html(page),
        )
            .into_response(),
    }
}
