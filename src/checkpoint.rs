// ABOUTME: Sync checkpoint persistence with JSON-file and in-memory backends
// ABOUTME: The orchestrator reads the checkpoint once per pass and writes it once after the join
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use async_trait::async_trait;
use insite_core::errors::AppResult;
use insite_core::models::SyncCheckpoint;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Where the sync checkpoint lives
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Current checkpoint; the default when nothing was saved yet
    ///
    /// # Errors
    ///
    /// Returns an error if a saved checkpoint cannot be read or parsed
    async fn load(&self) -> AppResult<SyncCheckpoint>;

    /// Replace the checkpoint
    ///
    /// # Errors
    ///
    /// Returns an error if the checkpoint cannot be written
    async fn save(&self, checkpoint: &SyncCheckpoint) -> AppResult<()>;
}

/// Checkpoint kept as pretty JSON in a file
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    /// Store backed by `path`; parent directories are created on save
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn load(&self) -> AppResult<SyncCheckpoint> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SyncCheckpoint::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, checkpoint: &SyncCheckpoint) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // Replaced via rename; readers never see a partial file
        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, serde_json::to_vec_pretty(checkpoint)?).await?;
        tokio::fs::rename(&staging, &self.path).await?;
        debug!(path = %self.path.display(), "checkpoint saved");
        Ok(())
    }
}

/// Checkpoint held in memory, shared between clones
#[derive(Debug, Clone, Default)]
pub struct InMemoryCheckpointStore {
    checkpoint: Arc<RwLock<SyncCheckpoint>>,
}

impl InMemoryCheckpointStore {
    /// Store starting from the default checkpoint
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store starting from `checkpoint`
    #[must_use]
    pub fn with_checkpoint(checkpoint: SyncCheckpoint) -> Self {
        Self {
            checkpoint: Arc::new(RwLock::new(checkpoint)),
        }
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn load(&self) -> AppResult<SyncCheckpoint> {
        Ok(*self.checkpoint.read().await)
    }

    async fn save(&self, checkpoint: &SyncCheckpoint) -> AppResult<()> {
        *self.checkpoint.write().await = *checkpoint;
        Ok(())
    }
}
