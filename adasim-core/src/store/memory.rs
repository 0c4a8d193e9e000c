//! In-memory store backend for tests and demo wiring.

use crate::error::{CoreError, Result};
use crate::store::{BulkOutcome, RejectedRecord, RunResultUpdate, RunStore};
use adasim_model::{
    Alert, AlertId, Run, RunId, RunStatus, SampleId, SensorSample,
};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;

#[derive(Default)]
struct Inner {
    runs: HashMap<RunId, Run>,
    // Insertion order is preserved so reads mirror batch order.
    samples: Vec<SensorSample>,
    alerts: Vec<Alert>,
}

/// Run store holding everything in process memory.
///
/// Mirrors the validation the Postgres backend delegates to its schema
/// constraints, so orchestrator behavior is identical against either
/// backend.
#[derive(Default)]
pub struct InMemoryRunStore {
    inner: Mutex<Inner>,
}

impl fmt::Debug for InMemoryRunStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("InMemoryRunStore")
            .field("runs", &inner.runs.len())
            .field("samples", &inner.samples.len())
            .field("alerts", &inner.alerts.len())
            .finish()
    }
}

impl InMemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn validate_sample(sample: &SensorSample) -> std::result::Result<(), String> {
    if let Some(distance) = sample.distance_to_object
        && distance < 0.0
    {
        return Err(format!("distance_to_object must be >= 0, got {distance}"));
    }
    Ok(())
}

#[async_trait]
impl RunStore for InMemoryRunStore {
    async fn insert_run(&self, run: Run) -> Result<()> {
        self.inner.lock().runs.insert(run.id, run);
        Ok(())
    }

    async fn get_run(&self, run_id: RunId) -> Result<Option<Run>> {
        Ok(self.inner.lock().runs.get(&run_id).cloned())
    }

    async fn insert_samples(
        &self,
        samples: Vec<SensorSample>,
    ) -> Result<BulkOutcome> {
        let mut inner = self.inner.lock();
        let mut outcome = BulkOutcome::default();

        for (index, sample) in samples.into_iter().enumerate() {
            if inner.samples.iter().any(|s| s.id == sample.id) {
                outcome.rejected.push(RejectedRecord {
                    index,
                    reason: format!("duplicate sample id {}", sample.id),
                });
                continue;
            }
            if let Err(reason) = validate_sample(&sample) {
                outcome.rejected.push(RejectedRecord { index, reason });
                continue;
            }
            outcome.accepted.push(sample.id.to_uuid());
            inner.samples.push(sample);
        }

        Ok(outcome)
    }

    async fn insert_alerts(&self, alerts: Vec<Alert>) -> Result<BulkOutcome> {
        let mut inner = self.inner.lock();
        let mut outcome = BulkOutcome::default();

        for (index, alert) in alerts.into_iter().enumerate() {
            if inner.alerts.iter().any(|a| a.id == alert.id) {
                outcome.rejected.push(RejectedRecord {
                    index,
                    reason: format!("duplicate alert id {}", alert.id),
                });
                continue;
            }
            outcome.accepted.push(alert.id.to_uuid());
            inner.alerts.push(alert);
        }

        Ok(outcome)
    }

    async fn update_alert_correlation(
        &self,
        alert_id: AlertId,
        sample_id: SampleId,
    ) -> Result<()> {
        let mut inner = self.inner.lock();
        let alert = inner
            .alerts
            .iter_mut()
            .find(|a| a.id == alert_id)
            .ok_or_else(|| {
                CoreError::not_found(format!("alert {alert_id} not found"))
            })?;
        alert.sample_id = Some(sample_id);
        Ok(())
    }

    async fn update_run_status(
        &self,
        run_id: RunId,
        status: RunStatus,
    ) -> Result<Run> {
        let mut inner = self.inner.lock();
        let run = inner.runs.get_mut(&run_id).ok_or_else(|| {
            CoreError::not_found(format!("run {run_id} not found"))
        })?;
        run.status = status;
        run.updated_at = Utc::now();
        Ok(run.clone())
    }

    async fn update_run_result(
        &self,
        run_id: RunId,
        update: RunResultUpdate,
    ) -> Result<Run> {
        let mut inner = self.inner.lock();
        let run = inner.runs.get_mut(&run_id).ok_or_else(|| {
            CoreError::not_found(format!("run {run_id} not found"))
        })?;
        run.status = update.status;
        run.summary = update.summary;
        run.sensor_sample_count = update.sensor_sample_count;
        run.video_ref = update.video_ref;
        run.updated_at = Utc::now();
        Ok(run.clone())
    }

    async fn video_ref(&self, run_id: RunId) -> Result<String> {
        let inner = self.inner.lock();
        inner
            .runs
            .get(&run_id)
            .and_then(|run| run.video_ref.clone())
            .ok_or_else(|| {
                CoreError::not_found(format!("run {run_id} has no video"))
            })
    }

    async fn count_samples(&self, run_id: RunId) -> Result<u32> {
        let inner = self.inner.lock();
        Ok(inner.samples.iter().filter(|s| s.run_id == run_id).count()
            as u32)
    }

    async fn samples_for_run(
        &self,
        run_id: RunId,
    ) -> Result<Vec<SensorSample>> {
        let inner = self.inner.lock();
        Ok(inner
            .samples
            .iter()
            .filter(|s| s.run_id == run_id)
            .cloned()
            .collect())
    }

    async fn alerts_for_run(&self, run_id: RunId) -> Result<Vec<Alert>> {
        let inner = self.inner.lock();
        Ok(inner
            .alerts
            .iter()
            .filter(|a| a.run_id == run_id)
            .cloned()
            .collect())
    }
}
