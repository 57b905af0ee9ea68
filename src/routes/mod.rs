// ABOUTME: Route module organization for the Momentum MCP server HTTP endpoints
// ABOUTME: Groups unauthenticated operational routes; OAuth and MCP routes live with their modules
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Momentum MCP Server Authors

/// Health check route
pub mod health;

pub use health::HealthRoutes;
