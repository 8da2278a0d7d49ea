// SPDX-License-Identifier: MIT

//! The in-memory state shared by [`crate::MemoryStore`] and [`crate::FileStore`].

use ghost_core::{KvEntry, MetricSample, ProcessRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::store::METRIC_RETENTION_MS;

/// Plain-data snapshot of everything a [`Store`](crate::Store) persists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreState {
    pub processes: HashMap<String, ProcessRecord>,
    /// Ordered oldest-first per process id.
    pub metrics: HashMap<String, Vec<MetricSample>>,
    pub kv: HashMap<String, KvEntry>,
}

impl StoreState {
    pub fn append_metric(&mut self, sample: MetricSample, now_ms: u64) {
        let series = self.metrics.entry(sample.process_id.clone()).or_default();
        series.push(sample);
        let cutoff = now_ms.saturating_sub(METRIC_RETENTION_MS);
        series.retain(|m| m.timestamp >= cutoff);
    }

    pub fn latest_metric(&self, process_id: &str) -> Option<MetricSample> {
        self.metrics.get(process_id).and_then(|series| series.last().cloned())
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
