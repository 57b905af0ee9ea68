// ABOUTME: Environment-based configuration for the HTTP listener and the OAuth authorization core
// ABOUTME: Parses ports, base URL, PIN, static token, token lifetimes, data directory and throttling limits
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Momentum MCP Server Authors

use std::env;
use std::fmt;
use std::path::PathBuf;

use tracing::warn;
use url::Url;

use crate::constants::{lifetimes, network, paths, rate_limits};
use crate::errors::{AppError, AppResult};
use crate::logging::LoggingConfig;

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen port
    pub http_port: u16,
    /// Bind address
    pub host: String,
    /// Public base URL without trailing slash; also the OAuth issuer
    pub base_url: String,
    /// Authorization settings
    pub auth: AuthConfig,
    /// Snapshot persistence settings
    pub persistence: PersistenceConfig,
    /// Token endpoint throttling
    pub rate_limit: RateLimitConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

/// Authorization settings
#[derive(Clone)]
pub struct AuthConfig {
    /// Static shared secret accepted as a bearer token
    pub static_token: Option<String>,
    /// Consent PIN; `None` means auto-approve
    pub authorize_pin: Option<String>,
    /// Access token lifetime in seconds
    pub access_token_ttl_secs: i64,
    /// Refresh token lifetime in seconds
    pub refresh_token_ttl_secs: i64,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("static_token", &self.static_token.as_ref().map(|_| "[REDACTED]"))
            .field("authorize_pin", &self.authorize_pin.as_ref().map(|_| "[REDACTED]"))
            .field("access_token_ttl_secs", &self.access_token_ttl_secs)
            .field("refresh_token_ttl_secs", &self.refresh_token_ttl_secs)
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            static_token: None,
            authorize_pin: None,
            access_token_ttl_secs: lifetimes::ACCESS_TOKEN_TTL_SECS,
            refresh_token_ttl_secs: lifetimes::REFRESH_TOKEN_TTL_SECS,
        }
    }
}

/// Snapshot persistence settings
#[derive(Debug, Clone, Default)]
pub struct PersistenceConfig {
    /// Directory holding the snapshot file; `None` keeps all state in memory
    pub data_dir: Option<PathBuf>,
}

/// Token endpoint throttling
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Requests admitted per window per source address
    pub token_requests_per_window: u32,
    /// Window length in seconds
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            token_requests_per_window: rate_limits::TOKEN_ENDPOINT_LIMIT,
            window_secs: rate_limits::TOKEN_ENDPOINT_WINDOW_SECS,
        }
    }
}

impl ServerConfig {
    /// Load configuration from process environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if `BASE_URL` is set but is not an absolute http(s) URL
    pub fn from_env() -> AppResult<Self> {
        let mut config = Self::from_lookup(|key| env::var(key).ok())?;
        config.logging = LoggingConfig::from_env();
        Ok(config)
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// Empty values are treated the same as unset ones.
    ///
    /// # Errors
    ///
    /// Returns an error if `BASE_URL` is not an absolute http(s) URL
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let http_port = get("PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(network::DEFAULT_PORT);
        let host = get("HOST").unwrap_or_else(|| network::DEFAULT_HOST.to_owned());

        let base_url = match get("BASE_URL") {
            Some(raw) => normalize_base_url(&raw)?,
            None => format!("http://localhost:{http_port}"),
        };

        let auth = AuthConfig {
            static_token: get("AUTH_TOKEN"),
            authorize_pin: get("OAUTH_AUTHORIZE_PIN"),
            access_token_ttl_secs: parse_positive_secs(
                "OAUTH_ACCESS_TOKEN_TTL",
                get("OAUTH_ACCESS_TOKEN_TTL").as_deref(),
                lifetimes::ACCESS_TOKEN_TTL_SECS,
            ),
            refresh_token_ttl_secs: parse_positive_secs(
                "OAUTH_REFRESH_TOKEN_TTL",
                get("OAUTH_REFRESH_TOKEN_TTL").as_deref(),
                lifetimes::REFRESH_TOKEN_TTL_SECS,
            ),
        };

        let rate_limit = RateLimitConfig {
            token_requests_per_window: get("OAUTH_TOKEN_RATE_LIMIT")
                .and_then(|s| s.parse().ok())
                .filter(|limit| *limit > 0)
                .unwrap_or(rate_limits::TOKEN_ENDPOINT_LIMIT),
            window_secs: get("OAUTH_TOKEN_RATE_WINDOW_SECS")
                .and_then(|s| s.parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(rate_limits::TOKEN_ENDPOINT_WINDOW_SECS),
        };

        Ok(Self {
            http_port,
            host,
            base_url,
            auth,
            persistence: PersistenceConfig {
                data_dir: get("DATA_DIR").map(PathBuf::from),
            },
            rate_limit,
            logging: LoggingConfig::default(),
        })
    }

    /// URL of the protected resource metadata document, embedded in bearer challenges
    #[must_use]
    pub fn resource_metadata_url(&self) -> String {
        format!("{}{}", self.base_url, paths::PROTECTED_RESOURCE_METADATA)
    }

    /// Log-safe one-line description of the active configuration
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "port={} base_url={} static_token={} pin={} access_ttl={}s refresh_ttl={}s persistence={} token_rate_limit={}/{}s",
            self.http_port,
            self.base_url,
            if self.auth.static_token.is_some() { "set" } else { "unset" },
            if self.auth.authorize_pin.is_some() { "set" } else { "auto-approve" },
            self.auth.access_token_ttl_secs,
            self.auth.refresh_token_ttl_secs,
            self.persistence
                .data_dir
                .as_ref()
                .map_or_else(|| "in-memory".to_owned(), |dir| dir.display().to_string()),
            self.rate_limit.token_requests_per_window,
            self.rate_limit.window_secs,
        )
    }
}

fn normalize_base_url(raw: &str) -> AppResult<String> {
    let trimmed = raw.trim_end_matches('/');
    let parsed = Url::parse(trimmed)
        .map_err(|e| AppError::config(format!("BASE_URL is not a valid URL: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(trimmed.to_owned()),
        other => Err(AppError::config(format!(
            "BASE_URL must use http or https, got {other}"
        ))),
    }
}

fn parse_positive_secs(key: &str, value: Option<&str>, default: i64) -> i64 {
    let Some(raw) = value else {
        return default;
    };
    match raw.parse::<i64>() {
        Ok(secs) if secs > 0 && secs <= lifetimes::MAX_TOKEN_TTL_SECS => secs,
        _ => {
            warn!(variable = key, "Ignoring invalid lifetime, using default of {default}s");
            default
        }
    }
}
