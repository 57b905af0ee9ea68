// ABOUTME: Server wiring that builds the authorization core, assembles the router and runs the listener
// ABOUTME: Starts the sweep and snapshot loops and flushes state on graceful shutdown
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Momentum MCP Server Authors

//! # Server
//!
//! One [`AuthorizationCore`] owns exactly one instance of every store; all
//! components receive their collaborators from it explicitly.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::header::{REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS};
use axum::http::HeaderValue;
use axum::{middleware as axum_middleware, Router};
use tokio::net::TcpListener;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::constants::intervals;
use crate::errors::{AppError, AppResult};
use crate::lifecycle::BackgroundTasks;
use crate::mcp::McpRoutes;
use crate::middleware::auth::{
    require_bearer, BearerAuth, MultiValidator, OAuthTokenValidator, StaticTokenValidator,
};
use crate::middleware::{create_request_span, MakeRequestUuid, REQUEST_ID_HEADER};
use crate::oauth2_server::{
    AuthCodeStore, ClientStore, LoadSummary, OAuth2AuthorizationServer, OAuth2Routes,
    PersistenceManager, SlidingWindowRateLimiter, TokenStore,
};
use crate::routes::HealthRoutes;

/// Time each background loop gets to finish after cancellation
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// The stores and protocol server shared by every request
pub struct AuthorizationCore {
    /// Access and refresh tokens
    pub tokens: Arc<TokenStore>,
    /// Pending authorization codes
    pub codes: Arc<AuthCodeStore>,
    /// Registered clients
    pub clients: Arc<ClientStore>,
    /// Snapshot persistence
    pub persistence: Arc<PersistenceManager>,
    /// Token endpoint limiter
    pub limiter: SlidingWindowRateLimiter,
    /// Protocol logic
    pub server: Arc<OAuth2AuthorizationServer>,
}

impl AuthorizationCore {
    /// Build every store from configuration; nothing is loaded or spawned yet
    #[must_use]
    pub fn new(config: &ServerConfig) -> Self {
        let tokens = Arc::new(TokenStore::new(
            config.auth.access_token_ttl_secs,
            config.auth.refresh_token_ttl_secs,
        ));
        let codes = Arc::new(AuthCodeStore::new());
        let clients = Arc::new(ClientStore::new());
        let persistence = Arc::new(PersistenceManager::new(
            config.persistence.data_dir.clone(),
            Arc::clone(&tokens),
            Arc::clone(&clients),
        ));
        let limiter = SlidingWindowRateLimiter::from_config(&config.rate_limit);
        let server = Arc::new(OAuth2AuthorizationServer::new(
            config.base_url.clone(),
            config.auth.authorize_pin.clone(),
            Arc::clone(&tokens),
            Arc::clone(&codes),
            Arc::clone(&clients),
            Arc::clone(&persistence),
        ));

        Self {
            tokens,
            codes,
            clients,
            persistence,
            limiter,
            server,
        }
    }

    /// Restore persisted tokens and clients
    pub async fn load(&self) -> LoadSummary {
        self.persistence.load().await
    }

    /// Spawn the sweep loops and the periodic snapshot loop
    #[must_use]
    pub fn start_background(&self) -> BackgroundTasks {
        let mut tasks = BackgroundTasks::new();
        tasks.register(
            "token_sweep",
            self.tokens
                .spawn_sweeper(intervals::TOKEN_SWEEP, tasks.listener()),
        );
        tasks.register(
            "auth_code_sweep",
            self.codes
                .spawn_sweeper(intervals::AUTH_CODE_SWEEP, tasks.listener()),
        );
        tasks.register(
            "rate_limit_sweep",
            self.limiter
                .spawn_sweeper(intervals::RATE_LIMIT_SWEEP, tasks.listener()),
        );
        tasks.register(
            "snapshot_save",
            self.persistence
                .start(intervals::SNAPSHOT_SAVE, tasks.listener()),
        );
        tasks
    }

    /// Bearer middleware state: the static secret if configured, then OAuth access tokens
    #[must_use]
    pub fn bearer_auth(&self, config: &ServerConfig) -> BearerAuth {
        let mut validator = MultiValidator::new();
        if let Some(secret) = config.auth.static_token.as_deref().filter(|s| !s.is_empty()) {
            validator = validator.with(Arc::new(StaticTokenValidator::new(secret)));
        }
        validator = validator.with(Arc::new(OAuthTokenValidator::new(Arc::clone(
            &self.tokens,
        ))));
        BearerAuth::new(validator, Some(config.resource_metadata_url()))
    }
}

/// Assemble the full application router
pub fn build_router(core: &AuthorizationCore, config: &ServerConfig) -> Router {
    let bearer = Arc::new(core.bearer_auth(config));
    let protected = McpRoutes::routes()
        .route_layer(axum_middleware::from_fn_with_state(bearer, require_bearer));

    Router::new()
        .merge(OAuth2Routes::routes(
            Arc::clone(&core.server),
            core.limiter.clone(),
        ))
        .merge(HealthRoutes::routes())
        .merge(protected)
        .layer(SetResponseHeaderLayer::overriding(
            X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(TraceLayer::new_for_http().make_span_with(create_request_span))
        .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
        .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuid))
}

/// Run the server until SIGINT or SIGTERM, then flush state
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server fails
pub async fn run(config: ServerConfig) -> AppResult<()> {
    let core = AuthorizationCore::new(&config);
    let loaded = core.load().await;
    info!(
        tokens = loaded.tokens,
        clients = loaded.clients,
        expired_skipped = loaded.expired_skipped,
        "authorization state restored"
    );

    let tasks = core.start_background();
    let router = build_router(&core, &config);

    let addr = format!("{}:{}", config.host, config.http_port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("failed to bind {addr}")).with_source(e))?;
    info!("Momentum MCP server listening on {addr}");

    let served = axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    // Loops stop first; the snapshot loop performs the final save on its way out
    tasks.shutdown(SHUTDOWN_GRACE).await;
    info!("server shut down gracefully");

    served.map_err(|e| AppError::internal("HTTP server failed").with_source(e))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("received shutdown signal");
}
