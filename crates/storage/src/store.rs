// SPDX-License-Identifier: MIT

//! Durable projection of [`ProcessRecord`] and [`MetricSample`], plus a
//! minimal key-value facet used by ad-hoc persistence.

use async_trait::async_trait;
use ghost_core::{KvEntry, MetricSample, ProcessRecord, ProcessState, ProcessStatus};

use crate::error::StorageError;

/// Abstract durable backend. Concrete Redis/SQLite/Postgres backends are out
/// of scope; [`crate::FileStore`] is the default, and [`crate::MemoryStore`]
/// is a non-durable drop-in for tests.
#[async_trait]
pub trait Store: Send + Sync {
    /// Upsert a process record.
    async fn save_process(&self, record: &ProcessRecord) -> Result<(), StorageError>;

    /// Partial status-only update; no-op if the id is unknown.
    async fn update_status(&self, id: &str, status: ProcessStatus) -> Result<(), StorageError>;

    /// Append a metric sample, trimming samples older than 24 hours for the same process id.
    async fn save_metric(&self, sample: MetricSample) -> Result<(), StorageError>;

    /// Records with status Starting or Running, for resume-on-startup discovery.
    async fn load_active(&self) -> Result<Vec<ProcessRecord>, StorageError>;

    /// Compact join of the latest metric with the process row. `None` returns all.
    async fn get_status(&self, id: Option<&str>) -> Result<Vec<ProcessState>, StorageError>;

    /// Flip any records still marked Running to Stopped; used during graceful shutdown.
    async fn checkpoint(&self) -> Result<(), StorageError>;

    async fn kv_put(&self, entry: KvEntry) -> Result<(), StorageError>;
    async fn kv_get(&self, key: &str, now_ms: u64) -> Result<Option<KvEntry>, StorageError>;
    async fn kv_delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Milliseconds in 24 hours, the metric retention window.
pub const METRIC_RETENTION_MS: u64 = 24 * 60 * 60 * 1000;
