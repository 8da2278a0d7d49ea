// SPDX-License-Identifier: MIT

//! JSON-snapshot-backed [`Store`] with rotated backups, the in-repo stand-in
//! for a durable backend (Redis/SQLite/Postgres are out of scope).

use async_trait::async_trait;
use ghost_core::{KvEntry, MetricSample, ProcessRecord, ProcessState, ProcessStatus};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::StorageError;
use crate::memory_store::MemoryStore;
use crate::state::StoreState;
use crate::store::Store;

const MAX_BAK_FILES: u32 = 3;

/// Pick the next `.bak` / `.bak.N` path, rotating older backups out.
fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };

    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }
    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }
    bak(1)
}

fn load_state(path: &Path) -> Result<StoreState, StorageError> {
    if !path.exists() {
        return Ok(StoreState::default());
    }
    let compressed = fs::read(path)?;
    let bytes = zstd::decode_all(&compressed[..]).map_err(|e| StorageError::Compression(e.to_string()))?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn write_state(path: &Path, state: &StoreState) -> Result<(), StorageError> {
    let bytes = serde_json::to_vec(state)?;
    let compressed = zstd::encode_all(&bytes[..], 0).map_err(|e| StorageError::Compression(e.to_string()))?;

    if path.exists() {
        let bak = rotate_bak_path(path);
        if let Err(e) = fs::copy(path, &bak) {
            warn!(error = %e, "failed to rotate store backup");
        }
    }

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, &compressed)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// File-backed `Store`. Every mutating call re-serializes the whole state and
/// atomically replaces the snapshot file via a temp-write-then-rename, with
/// up to three rotated `.bak` generations kept alongside it.
pub struct FileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl FileStore {
    /// Open (or create) a store rooted at `path`. Loads any existing snapshot.
    pub fn open(path: PathBuf) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let state = load_state(&path)?;
        Ok(Self { path, inner: MemoryStore::from_state(state) })
    }

    async fn persist(&self) -> Result<(), StorageError> {
        let path = self.path.clone();
        let state = self.inner.snapshot();
        tokio::task::spawn_blocking(move || write_state(&path, &state))
            .await
            .map_err(|e| StorageError::Io(std::io::Error::other(e)))?
    }
}

#[async_trait]
impl Store for FileStore {
    async fn save_process(&self, record: &ProcessRecord) -> Result<(), StorageError> {
        self.inner.save_process(record).await?;
        self.persist().await
    }

    async fn update_status(&self, id: &str, status: ProcessStatus) -> Result<(), StorageError> {
        self.inner.update_status(id, status).await?;
        self.persist().await
    }

    async fn save_metric(&self, sample: MetricSample) -> Result<(), StorageError> {
        self.inner.save_metric(sample).await?;
        self.persist().await
    }

    async fn load_active(&self) -> Result<Vec<ProcessRecord>, StorageError> {
        self.inner.load_active().await
    }

    async fn get_status(&self, id: Option<&str>) -> Result<Vec<ProcessState>, StorageError> {
        self.inner.get_status(id).await
    }

    async fn checkpoint(&self) -> Result<(), StorageError> {
        self.inner.checkpoint().await?;
        self.persist().await
    }

    async fn kv_put(&self, entry: KvEntry) -> Result<(), StorageError> {
        self.inner.kv_put(entry).await?;
        self.persist().await
    }

    async fn kv_get(&self, key: &str, now_ms: u64) -> Result<Option<KvEntry>, StorageError> {
        self.inner.kv_get(key, now_ms).await
    }

    async fn kv_delete(&self, key: &str) -> Result<(), StorageError> {
        self.inner.kv_delete(key).await?;
        self.persist().await
    }
}

#[cfg(test)]
#[path = "file_store_tests.rs"]
mod tests;
