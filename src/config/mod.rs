// ABOUTME: Configuration module for environment-derived server settings
// ABOUTME: Exposes the server, auth, persistence and rate limit configuration types
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Momentum MCP Server Authors

//! Configuration for the Momentum MCP server
//!
//! All settings come from environment variables; there is no configuration file.
//! See [`environment::ServerConfig::from_env`] for the full list.

/// Environment and server configuration
pub mod environment;

/// Re-export the configuration types used during wiring
pub use environment::{AuthConfig, PersistenceConfig, RateLimitConfig, ServerConfig};
