//! Metrics collection
//!
//! Provides per-stage timings for a pipeline run.

use crate::pipeline::{Stage, StageRecord};
use parking_lot::RwLock;
use std::time::Duration;

/// Metrics collector for stage executions
#[derive(Debug, Default)]
pub struct MetricsCollector {
    /// Collected records, in execution order
    records: RwLock<Vec<StageRecord>>,
}

impl MetricsCollector {
    /// Creates a new metrics collector
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome of a stage
    pub fn record(&self, record: StageRecord) {
        self.records.write().push(record);
    }

    /// Gets the record of a specific stage
    #[must_use]
    pub fn get(&self, stage: Stage) -> Option<StageRecord> {
        self.records
            .read()
            .iter()
            .find(|record| record.stage == stage)
            .cloned()
    }

    /// Gets all recorded stages, in execution order
    #[must_use]
    pub fn get_all(&self) -> Vec<StageRecord> {
        self.records.read().clone()
    }

    /// Sum of all recorded stage durations
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        self.records.read().iter().map(|record| record.duration).sum()
    }

    /// Logs one line per stage; info level when `monitor` is set, debug otherwise
    pub fn log_summary(&self, monitor: bool) {
        for record in self.records.read().iter() {
            if monitor {
                tracing::info!(
                    stage = %record.stage,
                    result = %record.result,
                    duration_ms = record.duration.as_millis(),
                    "Stage timing"
                );
            } else {
                tracing::debug!(
                    stage = %record.stage,
                    result = %record.result,
                    duration_ms = record.duration.as_millis(),
                    "Stage timing"
                );
            }
        }
    }
}
