// ABOUTME: Main library entry point for the Momentum MCP server
// ABOUTME: Exposes the OAuth 2.1 authorization core and the bearer-protected MCP endpoint
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Momentum MCP Server Authors

#![deny(unsafe_code)]

//! # Momentum MCP Server
//!
//! A Model Context Protocol server for personal productivity data, acting as
//! its own OAuth 2.1 authorization server so that remote MCP clients can
//! connect without a separate identity provider.
//!
//! ## Features
//!
//! - **Discovery**: RFC 9728 protected resource and RFC 8414 authorization server metadata
//! - **Authorization code flow**: mandatory PKCE S256, optional consent PIN
//! - **Refresh rotation**: refresh tokens are single-use and revoke their access tokens
//! - **Dynamic client registration**: RFC 7591 public clients
//! - **Persistence**: tokens and clients survive restarts via an atomic JSON snapshot
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use momentum_mcp_server::config::ServerConfig;
//! use momentum_mcp_server::errors::AppResult;
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let config = ServerConfig::from_env()?;
//!     momentum_mcp_server::server::run(config).await
//! }
//! ```

/// Environment-derived configuration
pub mod config;

/// Protocol constants, lifetimes and intervals
pub mod constants;

/// Unified error handling
pub mod errors;

/// JSON-RPC 2.0 message types
pub mod jsonrpc;

/// Shutdown signalling for background loops
pub mod lifecycle;

/// Structured logging setup
pub mod logging;

/// Bearer-protected MCP endpoint
pub mod mcp;

/// HTTP middleware for authentication, throttling and tracing
pub mod middleware;

/// OAuth 2.1 authorization server core
pub mod oauth2_server;

/// Unauthenticated operational routes
pub mod routes;

/// Router assembly and process lifecycle
pub mod server;
