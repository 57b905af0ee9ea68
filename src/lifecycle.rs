// ABOUTME: Shutdown coordination for background sweep and snapshot tasks
// ABOUTME: Broadcasts a single cancellation signal and tracks spawned task handles for orderly shutdown
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Momentum MCP Server Authors

//! Background task lifecycle
//!
//! Every long-running loop (token sweep, code sweep, rate limiter sweep, periodic
//! save) takes a [`ShutdownListener`] and exits when [`ShutdownSignal::trigger`] is
//! called. [`BackgroundTasks::shutdown`] triggers the signal and waits for the loops.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Sender side of the process-wide cancellation signal
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    tx: watch::Sender<bool>,
}

/// Receiver side handed to each background loop
#[derive(Debug, Clone)]
pub struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Create a signal that has not fired yet
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Obtain a listener for a new background task
    #[must_use]
    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }

    /// Fire the signal; idempotent
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownListener {
    /// Resolve once shutdown has been requested
    pub async fn cancelled(&mut self) {
        // A dropped sender also counts as shutdown
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Whether shutdown has already been requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }
}

/// Named handles of the spawned background loops
#[derive(Debug, Default)]
pub struct BackgroundTasks {
    signal: ShutdownSignal,
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl BackgroundTasks {
    /// Create an empty task set with a fresh signal
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Listener for a task about to be spawned
    #[must_use]
    pub fn listener(&self) -> ShutdownListener {
        self.signal.subscribe()
    }

    /// Record a spawned task
    pub fn register(&mut self, name: &'static str, handle: JoinHandle<()>) {
        debug!(task = name, "background task started");
        self.handles.push((name, handle));
    }

    /// Number of tracked tasks
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether no tasks are tracked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Trigger cancellation and wait for every task, aborting any that exceed `grace`
    pub async fn shutdown(self, grace: Duration) {
        self.signal.trigger();
        for (name, mut handle) in self.handles {
            if let Ok(joined) = tokio::time::timeout(grace, &mut handle).await {
                if let Err(e) = joined {
                    warn!(task = name, "background task ended abnormally: {e}");
                }
            } else {
                warn!(task = name, "background task did not stop in time, aborting");
                handle.abort();
            }
        }
    }
}
