// ABOUTME: Sliding-window per-address rate limiter guarding the token endpoint
// ABOUTME: Keeps recent request instants per IP in a sharded map and sweeps idle entries
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Momentum MCP Server Authors

use std::collections::VecDeque;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::RateLimitConfig;
use crate::lifecycle::ShutdownListener;

/// Sliding-window limiter keyed by source address
///
/// Uses `DashMap` for sharded locking so unrelated addresses do not contend.
#[derive(Debug, Clone)]
pub struct SlidingWindowRateLimiter {
    /// Per-IP admitted request instants, oldest first
    state: Arc<DashMap<IpAddr, VecDeque<Instant>>>,
    limit: u32,
    window: Duration,
}

impl SlidingWindowRateLimiter {
    /// Create a limiter admitting `limit` requests per `window` per address
    #[must_use]
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            state: Arc::new(DashMap::new()),
            limit,
            window,
        }
    }

    /// Create a limiter from configuration
    #[must_use]
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            config.token_requests_per_window,
            Duration::from_secs(config.window_secs),
        )
    }

    /// Window length
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Admitted requests per window
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Check and record a request from `addr` now
    #[must_use]
    pub fn allow(&self, addr: IpAddr) -> bool {
        self.allow_at(addr, Instant::now())
    }

    /// Check and record a request from `addr` at `now`
    ///
    /// Prunes instants at or before `now - window`, then admits if fewer than
    /// `limit` remain. Only admitted requests are recorded.
    #[must_use]
    pub fn allow_at(&self, addr: IpAddr, now: Instant) -> bool {
        let mut entry = self.state.entry(addr).or_default();
        if let Some(cutoff) = now.checked_sub(self.window) {
            while entry.front().is_some_and(|t| *t <= cutoff) {
                entry.pop_front();
            }
        }

        if entry.len() >= self.limit as usize {
            return false;
        }
        entry.push_back(now);
        true
    }

    /// Drop addresses with no request inside the window
    pub fn sweep_at(&self, now: Instant) -> usize {
        let before = self.state.len();
        self.state.retain(|_, instants| {
            instants
                .back()
                .is_some_and(|last| now.saturating_duration_since(*last) < self.window)
        });
        before.saturating_sub(self.state.len())
    }

    /// Number of tracked addresses
    #[must_use]
    pub fn tracked_addresses(&self) -> usize {
        self.state.len()
    }

    /// Spawn the periodic sweep of idle addresses
    pub fn spawn_sweeper(&self, every: Duration, mut shutdown: ShutdownListener) -> JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let removed = limiter.sweep_at(Instant::now());
                        if removed > 0 {
                            debug!(removed, "rate limiter sweep removed idle addresses");
                        }
                    }
                    () = shutdown.cancelled() => break,
                }
            }
        })
    }
}
