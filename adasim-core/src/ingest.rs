//! Ingestion orchestration: detector call, normalization, persistence,
//! correlation, aggregate commit, and event publication for one run.

use crate::correlate::correlate;
use crate::detector::{DetectorClient, ProcessRequest, normalize};
use crate::error::{CoreError, Result};
use crate::notify::Notifier;
use crate::store::{BulkOutcome, RunResultUpdate, RunStore};
use adasim_model::{
    Alert, AlertId, AlertType, CallerIdentity, ClientEvent, Run, RunId,
    RunStatus, RunSummary, SampleId,
};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Drives one run's detection results from the external detector into
/// the store and out to connected clients.
///
/// Side effects are deliberately non-transactional: when alert
/// persistence fails partway, already-persisted samples stay visible.
/// Reporting depends on partial data remaining observable, so there is
/// no rollback.
pub struct IngestOrchestrator {
    store: Arc<dyn RunStore>,
    detector: Arc<dyn DetectorClient>,
    notifier: Notifier,
    /// Runs with an ingestion currently in flight. Repeated calls for
    /// the same run are rejected instead of queued.
    in_flight: DashMap<RunId, ()>,
}

impl std::fmt::Debug for IngestOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestOrchestrator")
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}

/// Removes the in-flight marker when an ingestion ends, on every path.
struct InFlightGuard<'a> {
    map: &'a DashMap<RunId, ()>,
    run_id: RunId,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.map.remove(&self.run_id);
    }
}

impl IngestOrchestrator {
    pub fn new(
        store: Arc<dyn RunStore>,
        detector: Arc<dyn DetectorClient>,
        notifier: Notifier,
    ) -> Self {
        Self {
            store,
            detector,
            notifier,
            in_flight: DashMap::new(),
        }
    }

    /// Ingest the detection results for `run_id` on behalf of `caller`.
    ///
    /// Returns the updated run. The run always ends in a definite state:
    /// `completed`, or `failed` when the detector or the store gave out.
    #[instrument(skip(self, caller), fields(caller_id = %caller.id))]
    pub async fn ingest(
        &self,
        run_id: RunId,
        caller: &CallerIdentity,
    ) -> Result<Run> {
        let run = self
            .store
            .get_run(run_id)
            .await?
            .ok_or_else(|| {
                CoreError::not_found(format!("run {run_id} not found"))
            })?;

        if !caller.can_access(&run.user_id) {
            return Err(CoreError::authorization(
                "caller does not own this run",
            ));
        }

        // Completed runs never re-enter ingestion; failed runs may be
        // retried.
        if run.status == RunStatus::Completed {
            return Err(CoreError::validation(format!(
                "run {run_id} is already completed"
            )));
        }

        let _guard = self.begin(run_id)?;

        match self.run_pipeline(&run).await {
            Ok(updated) => Ok(updated),
            Err(e) => {
                self.fail_run(&run).await;
                Err(e)
            }
        }
    }

    fn begin(&self, run_id: RunId) -> Result<InFlightGuard<'_>> {
        use dashmap::mapref::entry::Entry;

        match self.in_flight.entry(run_id) {
            Entry::Occupied(_) => Err(CoreError::validation(format!(
                "ingestion already in flight for run {run_id}"
            ))),
            Entry::Vacant(entry) => {
                entry.insert(());
                Ok(InFlightGuard {
                    map: &self.in_flight,
                    run_id,
                })
            }
        }
    }

    async fn run_pipeline(&self, run: &Run) -> Result<Run> {
        let response = self
            .detector
            .process(ProcessRequest {
                asset_path: run.filepath.clone(),
                vehicle_id: run.vehicle_id,
                run_id: run.id,
                user_id: run.user_id,
            })
            .await?;

        let normalized = normalize(response, run);
        for (index, reason) in &normalized.rejected_samples {
            warn!(run_id = %run.id, index, %reason, "sample failed validation");
        }
        for (index, reason) in &normalized.rejected_alerts {
            warn!(run_id = %run.id, index, %reason, "alert failed validation");
        }

        // Samples are persisted before alerts are correlated; alerts are
        // correlated before the final status commits.
        let sample_outcome =
            self.store.insert_samples(normalized.samples.clone()).await?;
        log_rejects(run.id, "sample", &sample_outcome);
        let stored_samples =
            retain_accepted(normalized.samples, &sample_outcome, |s| {
                s.id.to_uuid()
            });

        let alert_outcome =
            self.store.insert_alerts(normalized.alerts.clone()).await?;
        log_rejects(run.id, "alert", &alert_outcome);
        let mut stored_alerts =
            retain_accepted(normalized.alerts, &alert_outcome, |a| {
                a.id.to_uuid()
            });

        let links = correlate(&stored_alerts, &stored_samples);
        for (alert_id, sample_id) in &links {
            self.store
                .update_alert_correlation(*alert_id, *sample_id)
                .await?;
        }
        apply_links(&mut stored_alerts, &links);

        let sample_count = self.store.count_samples(run.id).await?;
        let status = normalized
            .reported_status
            .unwrap_or(RunStatus::Completed);

        let updated = self
            .store
            .update_run_result(
                run.id,
                RunResultUpdate {
                    status,
                    summary: summarize(&stored_alerts),
                    sensor_sample_count: sample_count,
                    video_ref: normalized.video_ref.clone(),
                },
            )
            .await?;

        for alert in stored_alerts {
            self.notifier
                .publish(run.user_id, ClientEvent::AlertCreated { alert });
        }
        self.notifier.publish(
            run.user_id,
            ClientEvent::RunStatusChanged {
                run_id: updated.id,
                status: updated.status,
                summary: updated.summary,
                video_ref: updated.video_ref.clone(),
            },
        );

        info!(
            run_id = %run.id,
            status = %updated.status,
            samples = updated.sensor_sample_count,
            alerts = updated.summary.total_alerts,
            "ingestion finished"
        );

        Ok(updated)
    }

    /// Best-effort transition to `failed` plus one failure event. Called
    /// when the detector or the store gave out mid-pipeline; rows
    /// persisted before the failure stay visible.
    async fn fail_run(&self, run: &Run) {
        match self
            .store
            .update_run_status(run.id, RunStatus::Failed)
            .await
        {
            Ok(updated) => {
                self.notifier.publish(
                    run.user_id,
                    ClientEvent::RunStatusChanged {
                        run_id: updated.id,
                        status: updated.status,
                        summary: updated.summary,
                        video_ref: updated.video_ref,
                    },
                );
            }
            Err(e) => {
                warn!(run_id = %run.id, "could not mark run failed: {e}");
            }
        }
    }
}

fn log_rejects(run_id: RunId, kind: &str, outcome: &BulkOutcome) {
    for rejected in &outcome.rejected {
        warn!(
            %run_id,
            kind,
            index = rejected.index,
            reason = %rejected.reason,
            "record rejected by store"
        );
    }
}

fn retain_accepted<T>(
    records: Vec<T>,
    outcome: &BulkOutcome,
    id_of: impl Fn(&T) -> Uuid,
) -> Vec<T> {
    records
        .into_iter()
        .filter(|record| outcome.is_accepted(&id_of(record)))
        .collect()
}

fn apply_links(alerts: &mut [Alert], links: &[(AlertId, SampleId)]) {
    for (alert_id, sample_id) in links {
        if let Some(alert) = alerts.iter_mut().find(|a| a.id == *alert_id) {
            alert.sample_id = Some(*sample_id);
        }
    }
}

/// Tally accepted alerts into the run's aggregate counts.
fn summarize(alerts: &[Alert]) -> RunSummary {
    let mut summary = RunSummary {
        total_alerts: alerts.len() as u32,
        ..RunSummary::default()
    };
    for alert in alerts {
        match alert.alert_type {
            AlertType::Collision => summary.collision_count += 1,
            AlertType::LaneDeparture => summary.lane_departure_count += 1,
            AlertType::Obstacle => summary.obstacle_count += 1,
            AlertType::TrafficSign => summary.traffic_sign_count += 1,
        }
    }
    summary
}
