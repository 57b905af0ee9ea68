// ABOUTME: In-memory registry of issued access and refresh tokens with TTL expiry and background sweep
// ABOUTME: Supports cascade revocation of access tokens linked to a rotated refresh token
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Momentum MCP Server Authors

//! Token Store
//!
//! All access goes through one `RwLock`. `validate` takes the read side and only
//! upgrades to the write side to delete a record it found expired. Rotation uses
//! [`TokenStore::redeem_refresh`], which checks and revokes under a single write
//! acquisition so two concurrent rotations of the same refresh token cannot both win.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::models::{TokenKind, TokenRecord};
use super::tokens::generate_token;
use crate::constants::lifetimes::MAX_TOKEN_TTL_SECS;
use crate::errors::{AppError, AppResult};
use crate::lifecycle::ShutdownListener;

/// Why a refresh token could not be redeemed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshRejection {
    /// Unknown, expired, already rotated, or not a refresh token
    Invalid,
    /// The caller supplied a `client_id` that does not own the token
    ClientMismatch,
}

/// Registry of issued tokens keyed by value
#[derive(Debug)]
pub struct TokenStore {
    tokens: RwLock<HashMap<String, TokenRecord>>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenStore {
    /// Create an empty store with the given lifetimes in seconds
    ///
    /// Lifetimes are clamped to `0..=MAX_TOKEN_TTL_SECS`.
    #[must_use]
    pub fn new(access_ttl_secs: i64, refresh_ttl_secs: i64) -> Self {
        Self {
            tokens: RwLock::new(HashMap::new()),
            access_ttl: clamped_lifetime(access_ttl_secs),
            refresh_ttl: clamped_lifetime(refresh_ttl_secs),
        }
    }

    /// Access token lifetime in whole seconds
    #[must_use]
    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    /// Issue an access token, optionally linked to the refresh token that produced it
    ///
    /// # Errors
    ///
    /// Returns an internal error if the random source fails or the expiry is unrepresentable
    pub async fn issue_access(
        &self,
        client_id: &str,
        linked_refresh: Option<&str>,
    ) -> AppResult<(String, DateTime<Utc>)> {
        self.issue(
            TokenKind::Access,
            client_id,
            linked_refresh.map(str::to_owned),
        )
        .await
    }

    /// Issue a refresh token
    ///
    /// # Errors
    ///
    /// Returns an internal error if the random source fails or the expiry is unrepresentable
    pub async fn issue_refresh(&self, client_id: &str) -> AppResult<(String, DateTime<Utc>)> {
        self.issue(TokenKind::Refresh, client_id, None).await
    }

    async fn issue(
        &self,
        kind: TokenKind,
        client_id: &str,
        linked_refresh: Option<String>,
    ) -> AppResult<(String, DateTime<Utc>)> {
        let value = generate_token()?;
        let issued_at = Utc::now();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let expires_at = issued_at
            .checked_add_signed(ttl)
            .ok_or_else(|| AppError::internal("token expiry out of range"))?;

        let record = TokenRecord {
            value: value.clone(),
            kind,
            client_id: client_id.to_owned(),
            issued_at,
            expires_at,
            linked_refresh,
        };
        self.tokens.write().await.insert(value.clone(), record);

        Ok((value, expires_at))
    }

    /// Look up a token of the expected kind
    ///
    /// Unknown tokens, kind mismatches and expired tokens all return `None`.
    /// An expired record is removed as a side effect.
    pub async fn validate(&self, token: &str, expected: TokenKind) -> Option<TokenRecord> {
        let now = Utc::now();
        {
            let tokens = self.tokens.read().await;
            let record = tokens.get(token)?;
            if record.is_valid_at(now) {
                return (record.kind == expected).then(|| record.clone());
            }
        }

        let mut tokens = self.tokens.write().await;
        if tokens.get(token).is_some_and(|r| !r.is_valid_at(now)) {
            tokens.remove(token);
            debug!("removed expired token on lookup");
        }
        None
    }

    /// Remove a token; idempotent
    pub async fn revoke(&self, token: &str) {
        self.tokens.write().await.remove(token);
    }

    /// Remove a refresh token and every access token linked to it
    ///
    /// Returns the number of access tokens removed.
    pub async fn revoke_refresh_cascade(&self, refresh_token: &str) -> usize {
        let mut tokens = self.tokens.write().await;
        Self::cascade_locked(&mut tokens, refresh_token)
    }

    /// Validate a refresh token and revoke it with cascade in one critical section
    ///
    /// `client_id` is checked only when supplied. On mismatch the token is left intact.
    ///
    /// # Errors
    ///
    /// Returns a [`RefreshRejection`] when the token cannot be rotated
    pub async fn redeem_refresh(
        &self,
        refresh_token: &str,
        client_id: Option<&str>,
    ) -> Result<TokenRecord, RefreshRejection> {
        let now = Utc::now();
        let mut tokens = self.tokens.write().await;

        let Some(record) = tokens.get(refresh_token).cloned() else {
            return Err(RefreshRejection::Invalid);
        };
        if !record.is_valid_at(now) {
            tokens.remove(refresh_token);
            return Err(RefreshRejection::Invalid);
        }
        if record.kind != TokenKind::Refresh {
            return Err(RefreshRejection::Invalid);
        }

        if client_id.is_some_and(|id| id != record.client_id) {
            return Err(RefreshRejection::ClientMismatch);
        }

        Self::cascade_locked(&mut tokens, refresh_token);
        Ok(record)
    }

    fn cascade_locked(tokens: &mut HashMap<String, TokenRecord>, refresh_token: &str) -> usize {
        tokens.remove(refresh_token);
        let before = tokens.len();
        tokens.retain(|_, r| {
            !(r.kind == TokenKind::Access && r.linked_refresh.as_deref() == Some(refresh_token))
        });
        before - tokens.len()
    }

    /// Insert a record as-is; used when restoring a snapshot
    ///
    /// Returns `false` and skips the record if it is already expired.
    pub async fn restore(&self, record: TokenRecord) -> bool {
        if !record.is_valid_at(Utc::now()) {
            return false;
        }
        self.tokens
            .write()
            .await
            .insert(record.value.clone(), record);
        true
    }

    /// Copy of every non-expired record
    pub async fn live_records(&self) -> HashMap<String, TokenRecord> {
        let now = Utc::now();
        self.tokens
            .read()
            .await
            .iter()
            .filter(|(_, r)| r.is_valid_at(now))
            .map(|(k, r)| (k.clone(), r.clone()))
            .collect()
    }

    /// Delete all expired records, returning how many were removed
    pub async fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, r| r.is_valid_at(now));
        before - tokens.len()
    }

    /// Number of records currently held, expired or not
    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    /// Whether the store holds no records
    pub async fn is_empty(&self) -> bool {
        self.tokens.read().await.is_empty()
    }

    /// Spawn the periodic expiry sweep
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        every: StdDuration,
        mut shutdown: ShutdownListener,
    ) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            // First tick completes immediately
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let removed = store.sweep_expired().await;
                        if removed > 0 {
                            info!(removed, "token sweep removed expired tokens");
                        }
                    }
                    () = shutdown.cancelled() => {
                        debug!("token sweep received shutdown signal");
                        break;
                    }
                }
            }
        })
    }
}

fn clamped_lifetime(secs: i64) -> Duration {
    Duration::seconds(secs.clamp(0, MAX_TOKEN_TTL_SECS))
}
