// ABOUTME: Protocol constants for the authorization core: lifetimes, sweep cadences and fixed identifiers
// ABOUTME: Grouped by concern so configuration defaults and wire strings are defined in one place
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Momentum MCP Server Authors

//! Application constants grouped by domain

/// Token and code lifetimes
pub mod lifetimes {
    /// Default access token lifetime in seconds (1 hour)
    pub const ACCESS_TOKEN_TTL_SECS: i64 = 3600;

    /// Default refresh token lifetime in seconds (7 days)
    pub const REFRESH_TOKEN_TTL_SECS: i64 = 7 * 24 * 3600;

    /// Authorization code lifetime in seconds
    pub const AUTHORIZATION_CODE_TTL_SECS: i64 = 300;

    /// Longest configurable token lifetime in seconds (10 years)
    pub const MAX_TOKEN_TTL_SECS: i64 = 10 * 365 * 24 * 3600;
}

/// Background task cadences
pub mod intervals {
    use std::time::Duration;

    /// Token store expiry sweep
    pub const TOKEN_SWEEP: Duration = Duration::from_secs(5 * 60);

    /// Authorization code sweep
    pub const AUTH_CODE_SWEEP: Duration = Duration::from_secs(60);

    /// Rate limiter empty-entry sweep
    pub const RATE_LIMIT_SWEEP: Duration = Duration::from_secs(5 * 60);

    /// Periodic snapshot save
    pub const SNAPSHOT_SAVE: Duration = Duration::from_secs(60);
}

/// OAuth wire-level constants
pub mod oauth {
    /// Scopes advertised in discovery metadata
    pub const SCOPES_SUPPORTED: [&str; 2] = ["mcp:read", "mcp:write"];

    /// Scope string returned with every token response
    pub const GRANTED_SCOPE: &str = "mcp:read mcp:write";

    /// Token type returned with every token response
    pub const TOKEN_TYPE_BEARER: &str = "Bearer";

    /// Only supported PKCE method
    pub const PKCE_METHOD_S256: &str = "S256";

    /// Only supported response type
    pub const RESPONSE_TYPE_CODE: &str = "code";

    /// Grant type for code exchange
    pub const GRANT_AUTHORIZATION_CODE: &str = "authorization_code";

    /// Grant type for token rotation
    pub const GRANT_REFRESH_TOKEN: &str = "refresh_token";

    /// Token endpoint auth method for public clients
    pub const AUTH_METHOD_NONE: &str = "none";

    /// Random bytes behind every token, code and client identifier
    pub const TOKEN_BYTES: usize = 32;

    /// Length of a dynamically registered client identifier
    pub const CLIENT_ID_LENGTH: usize = 16;

    /// Documentation link published in authorization server metadata
    pub const SERVICE_DOCUMENTATION: &str = "https://github.com/dang-w/momentum-mcp-server";
}

/// The pre-registered client that is seeded on every start
pub mod seeded_client {
    /// Client identifier
    pub const CLIENT_ID: &str = "claude-ai";

    /// Display name shown on the consent page
    pub const CLIENT_NAME: &str = "Claude.ai";

    /// Registered callback URIs
    pub const REDIRECT_URIS: [&str; 2] = [
        "https://claude.ai/api/mcp/auth_callback",
        "https://www.claude.ai/api/mcp/auth_callback",
    ];
}

/// Well-known endpoint paths
pub mod paths {
    /// RFC 9728 protected resource metadata
    pub const PROTECTED_RESOURCE_METADATA: &str = "/.well-known/oauth-protected-resource";

    /// RFC 8414 authorization server metadata
    pub const AUTHORIZATION_SERVER_METADATA: &str = "/.well-known/oauth-authorization-server";

    /// Authorization endpoint
    pub const AUTHORIZE: &str = "/authorize";

    /// Token endpoint
    pub const TOKEN: &str = "/token";

    /// Dynamic client registration endpoint
    pub const REGISTER: &str = "/register";

    /// Protocol endpoint
    pub const MCP: &str = "/mcp";

    /// Liveness probe
    pub const HEALTH: &str = "/health";
}

/// Snapshot persistence
pub mod persistence {
    /// Snapshot file name inside the data directory
    pub const SNAPSHOT_FILE: &str = "oauth_state.json";

    /// Suffix of the temporary file renamed over the snapshot
    pub const TEMP_SUFFIX: &str = "tmp";

    /// Snapshot file permissions
    pub const FILE_MODE: u32 = 0o600;

    /// Data directory permissions
    pub const DIR_MODE: u32 = 0o700;
}

/// Token endpoint throttling defaults
pub mod rate_limits {
    /// Requests admitted per window per source address
    pub const TOKEN_ENDPOINT_LIMIT: u32 = 10;

    /// Window length in seconds
    pub const TOKEN_ENDPOINT_WINDOW_SECS: u64 = 60;
}

/// Service identity
pub mod service_names {
    /// Service name used in logs and protocol handshakes
    pub const MOMENTUM_MCP_SERVER: &str = "momentum-mcp-server";
}

/// Defaults for the HTTP listener
pub mod network {
    /// Default listen port
    pub const DEFAULT_PORT: u16 = 8080;

    /// Default bind host
    pub const DEFAULT_HOST: &str = "0.0.0.0";
}
