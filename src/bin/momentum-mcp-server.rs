// ABOUTME: Process entry point for the Momentum MCP server
// ABOUTME: Loads environment configuration, applies CLI overrides, initializes logging and runs the server
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Momentum MCP Server Authors

//! # Momentum MCP Server Binary
//!
//! Configuration comes from the environment; `--port` and `--host` override it.

use std::env;

use anyhow::Result;
use clap::Parser;
use momentum_mcp_server::config::ServerConfig;
use momentum_mcp_server::server;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "momentum-mcp-server")]
#[command(about = "Momentum MCP server - OAuth-protected productivity data for MCP clients")]
#[command(version)]
pub struct Args {
    /// Override HTTP port
    #[arg(long)]
    port: Option<u16>,

    /// Override bind address
    #[arg(long)]
    host: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(port) = args.port {
        config.http_port = port;
        // The default base URL embeds the port
        if env::var("BASE_URL").ok().filter(|v| !v.is_empty()).is_none() {
            config.base_url = format!("http://localhost:{port}");
        }
    }
    if let Some(host) = args.host {
        config.host = host;
    }

    config.logging.init()?;

    info!("Starting Momentum MCP server");
    info!("{}", config.summary());

    if let Err(e) = server::run(config).await {
        error!("server terminated with error: {e}");
        return Err(e.into());
    }
    Ok(())
}
