// ABOUTME: Health check route handler for service monitoring
// ABOUTME: Serves an unauthenticated liveness probe for load balancers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Momentum MCP Server Authors

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::constants::paths;

/// Health routes implementation
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create the health check route
    pub fn routes() -> Router {
        async fn health_handler() -> Json<Value> {
            Json(json!({ "status": "ok" }))
        }

        Router::new().route(paths::HEALTH, get(health_handler))
    }
}
