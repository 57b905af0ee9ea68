// ABOUTME: Minimal MCP protocol endpoint served behind the bearer gate
// ABOUTME: Answers JSON-RPC initialize, ping, tools/list and tools/call for the built-in ping tool
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Momentum MCP Server Authors

//! # MCP Endpoint
//!
//! Stands in for the productivity-data tools. Mounted at `/mcp` and `/`,
//! both guarded by [`require_bearer`](crate::middleware::require_bearer).

use axum::body::Bytes;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tracing::debug;

use crate::constants::{paths, service_names};
use crate::jsonrpc::{error_codes, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION};

/// MCP protocol revision announced by `initialize`
pub const MCP_PROTOCOL_VERSION: &str = "2025-06-18";

/// Name of the single built-in tool
pub const PING_TOOL: &str = "ping";

/// MCP routes implementation
pub struct McpRoutes;

impl McpRoutes {
    /// Create the protocol routes; callers attach authentication
    pub fn routes() -> Router {
        Router::new()
            .route(paths::MCP, post(handle_mcp))
            .route("/", post(handle_mcp))
    }
}

async fn handle_mcp(body: Bytes) -> Response {
    let request: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            debug!("unparseable JSON-RPC body: {e}");
            return Json(JsonRpcResponse::error(
                None,
                error_codes::PARSE_ERROR,
                "Parse error",
            ))
            .into_response();
        }
    };

    if request.is_notification() {
        debug!(method = %request.method, "accepted notification");
        return StatusCode::ACCEPTED.into_response();
    }

    Json(process_request(&request)).into_response()
}

/// Dispatch one JSON-RPC request
#[must_use]
pub fn process_request(request: &JsonRpcRequest) -> JsonRpcResponse {
    let id = request.id.clone();
    if request.jsonrpc != JSONRPC_VERSION {
        return JsonRpcResponse::error(
            id,
            error_codes::INVALID_REQUEST,
            "Invalid JSON-RPC version",
        );
    }

    debug!(method = %request.method, "handling MCP request");
    match request.method.as_str() {
        "initialize" => JsonRpcResponse::success(id, initialize_result()),
        "ping" => JsonRpcResponse::success(id, json!({})),
        "tools/list" => JsonRpcResponse::success(id, json!({ "tools": [ping_tool_schema()] })),
        "tools/call" => handle_tool_call(id, request.params.as_ref()),
        other => JsonRpcResponse::error(
            id,
            error_codes::METHOD_NOT_FOUND,
            format!("Method not found: {other}"),
        ),
    }
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": MCP_PROTOCOL_VERSION,
        "capabilities": {
            "tools": {}
        },
        "serverInfo": {
            "name": service_names::MOMENTUM_MCP_SERVER,
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

fn ping_tool_schema() -> Value {
    json!({
        "name": PING_TOOL,
        "description": "Check that the server is reachable and the session is authorized",
        "inputSchema": {
            "type": "object",
            "properties": {}
        }
    })
}

fn handle_tool_call(id: Option<Value>, params: Option<&Value>) -> JsonRpcResponse {
    let Some(name) = params.and_then(|p| p.get("name")).and_then(Value::as_str) else {
        return JsonRpcResponse::error(id, error_codes::INVALID_PARAMS, "Missing tool name");
    };

    if name != PING_TOOL {
        return JsonRpcResponse::error(
            id,
            error_codes::INVALID_PARAMS,
            format!("Unknown tool: {name}"),
        );
    }

    JsonRpcResponse::success(
        id,
        json!({
            "content": [{ "type": "text", "text": "pong" }],
            "isError": false
        }),
    )
}
