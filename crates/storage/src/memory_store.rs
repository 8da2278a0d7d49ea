// SPDX-License-Identifier: MIT

//! Non-durable [`Store`] implementation backing tests and the in-process
//! defaults used before a `FileStore` is configured.

use async_trait::async_trait;
use ghost_core::{KvEntry, MetricSample, ProcessRecord, ProcessState, ProcessStatus};
use parking_lot::Mutex;

use crate::error::StorageError;
use crate::state::StoreState;
use crate::store::Store;

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_state(state: StoreState) -> Self {
        Self { state: Mutex::new(state) }
    }

    pub(crate) fn snapshot(&self) -> StoreState {
        self.state.lock().clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn save_process(&self, record: &ProcessRecord) -> Result<(), StorageError> {
        self.state.lock().processes.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn update_status(&self, id: &str, status: ProcessStatus) -> Result<(), StorageError> {
        if let Some(record) = self.state.lock().processes.get_mut(id) {
            record.status = status;
        }
        Ok(())
    }

    async fn save_metric(&self, sample: MetricSample) -> Result<(), StorageError> {
        let now_ms = sample.timestamp;
        self.state.lock().append_metric(sample, now_ms);
        Ok(())
    }

    async fn load_active(&self) -> Result<Vec<ProcessRecord>, StorageError> {
        Ok(self
            .state
            .lock()
            .processes
            .values()
            .filter(|r| matches!(r.status, ProcessStatus::Starting | ProcessStatus::Running))
            .cloned()
            .collect())
    }

    async fn get_status(&self, id: Option<&str>) -> Result<Vec<ProcessState>, StorageError> {
        let state = self.state.lock();
        let records: Vec<&ProcessRecord> = match id {
            Some(id) => state.processes.get(id).into_iter().collect(),
            None => state.processes.values().collect(),
        };
        Ok(records
            .into_iter()
            .map(|record| ProcessState {
                latest_metric: state.latest_metric(&record.id),
                record: record.clone(),
            })
            .collect())
    }

    async fn checkpoint(&self) -> Result<(), StorageError> {
        let mut state = self.state.lock();
        for record in state.processes.values_mut() {
            if record.status == ProcessStatus::Running {
                record.status = ProcessStatus::Stopped;
                record.pid = None;
            }
        }
        Ok(())
    }

    async fn kv_put(&self, entry: KvEntry) -> Result<(), StorageError> {
        self.state.lock().kv.insert(entry.key.clone(), entry);
        Ok(())
    }

    async fn kv_get(&self, key: &str, now_ms: u64) -> Result<Option<KvEntry>, StorageError> {
        let mut state = self.state.lock();
        if state.kv.get(key).is_some_and(|e| e.is_expired(now_ms)) {
            state.kv.remove(key);
            return Ok(None);
        }
        Ok(state.kv.get(key).cloned())
    }

    async fn kv_delete(&self, key: &str) -> Result<(), StorageError> {
        self.state.lock().kv.remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_store_tests.rs"]
mod tests;
