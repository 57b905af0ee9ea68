// ABOUTME: Short-lived single-use authorization codes bound to client, redirect URI and PKCE challenge
// ABOUTME: Redemption checks and marks a code under one lock so it can never produce two token pairs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Momentum MCP Server Authors

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use super::models::AuthorizationCode;
use crate::lifecycle::ShutdownListener;

/// Authorization-code store
#[derive(Debug, Default)]
pub struct AuthCodeStore {
    codes: Mutex<HashMap<String, AuthorizationCode>>,
}

impl AuthCodeStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a code; an existing record with the same value is replaced
    pub async fn store(&self, code: AuthorizationCode) {
        self.codes.lock().await.insert(code.code.clone(), code);
    }

    /// Redeem a code
    ///
    /// Returns `None` without changing state if the code is unknown, already used
    /// or expired. Otherwise marks it used and returns it.
    pub async fn get(&self, code: &str) -> Option<AuthorizationCode> {
        let now = Utc::now();
        let mut codes = self.codes.lock().await;
        let record = codes.get_mut(code)?;
        if !record.is_redeemable_at(now) {
            return None;
        }
        record.used = true;
        Some(record.clone())
    }

    /// Remove used and expired codes, returning how many were removed
    pub async fn sweep(&self) -> usize {
        let now = Utc::now();
        let mut codes = self.codes.lock().await;
        let before = codes.len();
        codes.retain(|_, c| c.is_redeemable_at(now));
        before - codes.len()
    }

    /// Number of codes held
    pub async fn len(&self) -> usize {
        self.codes.lock().await.len()
    }

    /// Whether no codes are held
    pub async fn is_empty(&self) -> bool {
        self.codes.lock().await.is_empty()
    }

    /// Spawn the periodic sweep of used and expired codes
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        every: Duration,
        mut shutdown: ShutdownListener,
    ) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let removed = store.sweep().await;
                        if removed > 0 {
                            debug!(removed, "authorization code sweep");
                        }
                    }
                    () = shutdown.cancelled() => break,
                }
            }
        })
    }
}
