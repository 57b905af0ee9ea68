// ABOUTME: Snapshot persistence of tokens and clients to a single JSON file with atomic replace
// ABOUTME: Runs a periodic save loop, fire-and-forget triggered saves and a final flush on stop
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Momentum MCP Server Authors

//! Persistence Manager
//!
//! Persistence is best-effort. Public entry points log I/O and decode failures and
//! carry on; only [`PersistenceManager::write_snapshot`] and
//! [`PersistenceManager::read_snapshot`] surface errors, for callers that want them.
//!
//! The manager never touches store internals: it reads through
//! [`TokenStore::live_records`] and [`ClientStore::all`], and restores through
//! [`TokenStore::restore`] and [`ClientStore::register`]. Each call takes and
//! releases one store's lock before the next is taken.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::client_registration::ClientStore;
use super::models::PersistedSnapshot;
use super::token_store::TokenStore;
use crate::constants::persistence::{DIR_MODE, FILE_MODE, SNAPSHOT_FILE, TEMP_SUFFIX};
use crate::errors::AppResult;
use crate::lifecycle::ShutdownListener;

/// Counts restored by [`PersistenceManager::load`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Non-expired tokens restored
    pub tokens: usize,
    /// Clients restored, excluding the seeded client
    pub clients: usize,
    /// Expired tokens skipped
    pub expired_skipped: usize,
}

/// Snapshot writer and loader for the token and client stores
#[derive(Debug)]
pub struct PersistenceManager {
    data_dir: Option<PathBuf>,
    tokens: Arc<TokenStore>,
    clients: Arc<ClientStore>,
    // Serializes writers of the temp file
    write_lock: Mutex<()>,
}

impl PersistenceManager {
    /// Create a manager; `data_dir = None` makes every operation a no-op
    #[must_use]
    pub fn new(
        data_dir: Option<PathBuf>,
        tokens: Arc<TokenStore>,
        clients: Arc<ClientStore>,
    ) -> Self {
        Self {
            data_dir,
            tokens,
            clients,
            write_lock: Mutex::new(()),
        }
    }

    /// Whether a data directory is configured
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.data_dir.is_some()
    }

    /// Full path of the snapshot file, if persistence is enabled
    #[must_use]
    pub fn snapshot_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join(SNAPSHOT_FILE))
    }

    /// Restore state from the snapshot file
    ///
    /// A missing file is a normal first run. Unreadable or corrupt files are logged
    /// and treated as empty state.
    pub async fn load(&self) -> LoadSummary {
        let Some(path) = self.snapshot_path() else {
            return LoadSummary::default();
        };

        let snapshot = match Self::read_snapshot(&path).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                info!(path = %path.display(), "no oauth state snapshot found, starting fresh");
                return LoadSummary::default();
            }
            Err(e) => {
                error!(path = %path.display(), "failed to load oauth state snapshot, starting fresh: {e}");
                return LoadSummary::default();
            }
        };

        let mut summary = LoadSummary::default();
        for record in snapshot.tokens.into_values() {
            if self.tokens.restore(record).await {
                summary.tokens += 1;
            } else {
                summary.expired_skipped += 1;
            }
        }
        for client in snapshot.clients.into_values() {
            if ClientStore::is_seeded(&client.client_id) {
                continue;
            }
            self.clients.register(client).await;
            summary.clients += 1;
        }

        info!(
            tokens = summary.tokens,
            clients = summary.clients,
            expired_skipped = summary.expired_skipped,
            "restored oauth state snapshot"
        );
        summary
    }

    /// Read and decode a snapshot file; `Ok(None)` when it does not exist
    ///
    /// # Errors
    ///
    /// Returns a storage error for unreadable files and a serialization error for
    /// malformed JSON
    pub async fn read_snapshot(path: &Path) -> AppResult<Option<PersistedSnapshot>> {
        match fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Save a snapshot now, logging any failure
    pub async fn save(&self) {
        if let Err(e) = self.write_snapshot().await {
            error!("failed to save oauth state snapshot: {e}");
        }
    }

    /// Gather and atomically write a snapshot
    ///
    /// Returns the number of tokens written, or `0` when persistence is disabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory, temp file or rename fails, or if encoding fails
    pub async fn write_snapshot(&self) -> AppResult<usize> {
        let Some(dir) = &self.data_dir else {
            return Ok(0);
        };

        // Held across gathering so a later snapshot never lands before an earlier one
        let _guard = self.write_lock.lock().await;
        let tokens = self.tokens.live_records().await;
        let clients = self.clients.all().await;

        let token_count = tokens.len();
        let snapshot = PersistedSnapshot {
            tokens,
            clients,
            saved_at: Some(Utc::now()),
        };
        let encoded = serde_json::to_vec_pretty(&snapshot)?;

        create_private_dir(dir).await?;

        let final_path = dir.join(SNAPSHOT_FILE);
        let temp_path = final_path.with_extension(format!("json.{TEMP_SUFFIX}"));
        // A leftover temp file from a crash may carry other permissions
        let _ = fs::remove_file(&temp_path).await;
        write_private_file(&temp_path, &encoded).await?;
        if let Err(e) = fs::rename(&temp_path, &final_path).await {
            // Leave no stale temp file behind
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        debug!(tokens = token_count, "saved oauth state snapshot");
        Ok(token_count)
    }

    /// Fire-and-forget save, for use after security-relevant state changes
    pub fn trigger_save(self: &Arc<Self>) {
        if !self.is_enabled() {
            return;
        }
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            manager.save().await;
        });
    }

    /// Spawn the periodic save loop; it performs a final save when shutdown fires
    pub fn start(self: &Arc<Self>, every: Duration, mut shutdown: ShutdownListener) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => manager.save().await,
                    () = shutdown.cancelled() => {
                        manager.stop().await;
                        break;
                    }
                }
            }
        })
    }

    /// Perform one final save
    pub async fn stop(&self) {
        if !self.is_enabled() {
            return;
        }
        match self.write_snapshot().await {
            Ok(count) => info!(tokens = count, "final oauth state snapshot saved"),
            Err(e) => warn!("final oauth state snapshot failed: {e}"),
        }
    }
}

#[cfg(unix)]
async fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    fs::DirBuilder::new()
        .recursive(true)
        .mode(DIR_MODE)
        .create(dir)
        .await
}

#[cfg(not(unix))]
async fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    let _ = DIR_MODE;
    fs::create_dir_all(dir).await
}

async fn write_private_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(FILE_MODE);
    #[cfg(not(unix))]
    let _ = FILE_MODE;

    let mut file = options.open(path).await?;
    file.write_all(contents).await?;
    file.sync_all().await?;
    Ok(())
}
