//! Persistence port for runs, sensor samples, and alerts.

use crate::error::Result;
use adasim_model::{
    Alert, AlertId, Run, RunId, RunStatus, RunSummary, SampleId, SensorSample,
};
use async_trait::async_trait;
use uuid::Uuid;

pub mod memory;
#[cfg(feature = "database")]
pub mod postgres;

pub use memory::InMemoryRunStore;
#[cfg(feature = "database")]
pub use postgres::PostgresRunStore;

/// A record rejected during a bulk insert, with the reason it was
/// dropped. Rejection never aborts the rest of the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRecord {
    /// Position of the record in the submitted batch.
    pub index: usize,
    pub reason: String,
}

/// Outcome of an unordered bulk insert: ids that were stored and the
/// records that were silently excluded. "Some records are dropped" is a
/// documented contract of the store, not an error.
#[derive(Debug, Clone, Default)]
pub struct BulkOutcome {
    pub accepted: Vec<Uuid>,
    pub rejected: Vec<RejectedRecord>,
}

impl BulkOutcome {
    pub fn accepted_count(&self) -> usize {
        self.accepted.len()
    }

    pub fn is_accepted(&self, id: &Uuid) -> bool {
        self.accepted.contains(id)
    }
}

/// Final aggregate state committed to a run at the end of ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResultUpdate {
    pub status: RunStatus,
    pub summary: RunSummary,
    /// Count of sample rows that actually exist in the store.
    pub sensor_sample_count: u32,
    pub video_ref: Option<String>,
}

/// Storage port for the three record kinds.
///
/// No locking: each run's records are written by exactly one in-flight
/// ingestion, and ingestions for distinct runs touch disjoint record
/// sets. Backends must support concurrent writers on disjoint run ids.
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Create a run record. Used by the upload collaborator and tests.
    async fn insert_run(&self, run: Run) -> Result<()>;

    async fn get_run(&self, run_id: RunId) -> Result<Option<Run>>;

    /// Unordered bulk insert; per-record failures land in
    /// [`BulkOutcome::rejected`] and never abort the batch.
    async fn insert_samples(
        &self,
        samples: Vec<SensorSample>,
    ) -> Result<BulkOutcome>;

    /// Unordered bulk insert with the same semantics as
    /// [`RunStore::insert_samples`].
    async fn insert_alerts(&self, alerts: Vec<Alert>) -> Result<BulkOutcome>;

    /// Attach the correlated-sample reference to an alert. The reference
    /// is set at most once, after which the alert is immutable.
    async fn update_alert_correlation(
        &self,
        alert_id: AlertId,
        sample_id: SampleId,
    ) -> Result<()>;

    /// Transition a run's status without touching its aggregates. Used by
    /// the failure path, where no payload was accepted.
    async fn update_run_status(
        &self,
        run_id: RunId,
        status: RunStatus,
    ) -> Result<Run>;

    /// Commit the final aggregate state of an ingestion.
    async fn update_run_result(
        &self,
        run_id: RunId,
        update: RunResultUpdate,
    ) -> Result<Run>;

    /// Stored video reference for a run; `NotFound` when the run is
    /// missing or has no video yet.
    async fn video_ref(&self, run_id: RunId) -> Result<String>;

    /// Number of sample rows that actually exist for a run.
    async fn count_samples(&self, run_id: RunId) -> Result<u32>;

    async fn samples_for_run(&self, run_id: RunId)
    -> Result<Vec<SensorSample>>;

    async fn alerts_for_run(&self, run_id: RunId) -> Result<Vec<Alert>>;
}
