//! Postgres store backend.

use crate::error::{CoreError, Result};
use crate::store::{BulkOutcome, RejectedRecord, RunResultUpdate, RunStore};
use adasim_model::{
    Alert, AlertId, AlertType, FileType, LaneStatus, Run, RunId, RunStatus,
    RunSummary, SampleId, SensorSample, Severity, TrackId, UserId, VehicleId,
};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::fmt;
use std::str::FromStr;
use tracing::warn;
use uuid::Uuid;

/// Run store backed by PostgreSQL.
///
/// Bulk inserts execute row by row so one rejected record (a schema
/// constraint violation) never aborts the rest of the batch. Rows of
/// distinct runs are disjoint, so concurrent ingestions need no
/// store-level locking.
#[derive(Clone)]
pub struct PostgresRunStore {
    pool: PgPool,
}

impl fmt::Debug for PostgresRunStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresRunStore")
            .field("pool_size", &self.pool.size())
            .finish()
    }
}

impl PostgresRunStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(connection_string: &str) -> Result<Self> {
        let max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(connection_string)
            .await
            .map_err(|e| {
                CoreError::persistence(format!("database connection failed: {e}"))
            })?;

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run embedded migrations.
    pub async fn initialize_schema(&self) -> Result<()> {
        crate::MIGRATOR.run(&self.pool).await.map_err(|e| {
            CoreError::persistence(format!("migration failed: {e}"))
        })?;
        Ok(())
    }
}

fn persistence(e: sqlx::Error) -> CoreError {
    CoreError::persistence(format!("database query failed: {e}"))
}

/// Split a bulk-insert failure into "this record was rejected" versus
/// "the store itself failed". Constraint and data errors reject the
/// record; everything else aborts with `Persistence`.
fn rejection_reason(e: &sqlx::Error) -> Option<String> {
    match e {
        sqlx::Error::Database(db) => Some(db.message().to_string()),
        sqlx::Error::Encode(e) => Some(e.to_string()),
        _ => None,
    }
}

fn run_from_row(row: &PgRow) -> Result<Run> {
    let status: String = row.try_get("status").map_err(persistence)?;
    let file_type: String = row.try_get("file_type").map_err(persistence)?;

    Ok(Run {
        id: RunId(row.try_get::<Uuid, _>("id").map_err(persistence)?),
        vehicle_id: VehicleId(
            row.try_get::<Uuid, _>("vehicle_id").map_err(persistence)?,
        ),
        user_id: UserId(row.try_get::<Uuid, _>("user_id").map_err(persistence)?),
        filename: row.try_get("filename").map_err(persistence)?,
        filepath: row.try_get("filepath").map_err(persistence)?,
        file_type: FileType::from_str(&file_type)
            .map_err(|e| CoreError::persistence(e.to_string()))?,
        status: RunStatus::from_str(&status)
            .map_err(|e| CoreError::persistence(e.to_string()))?,
        summary: RunSummary {
            total_alerts: row.try_get::<i32, _>("total_alerts").map_err(persistence)? as u32,
            collision_count: row.try_get::<i32, _>("collision_count").map_err(persistence)?
                as u32,
            lane_departure_count: row
                .try_get::<i32, _>("lane_departure_count")
                .map_err(persistence)? as u32,
            obstacle_count: row.try_get::<i32, _>("obstacle_count").map_err(persistence)?
                as u32,
            traffic_sign_count: row
                .try_get::<i32, _>("traffic_sign_count")
                .map_err(persistence)? as u32,
        },
        sensor_sample_count: row
            .try_get::<i32, _>("sensor_sample_count")
            .map_err(persistence)? as u32,
        video_ref: row.try_get("video_ref").map_err(persistence)?,
        created_at: row.try_get("created_at").map_err(persistence)?,
        updated_at: row.try_get("updated_at").map_err(persistence)?,
    })
}

fn sample_from_row(row: &PgRow) -> Result<SensorSample> {
    let lane_status: String = row.try_get("lane_status").map_err(persistence)?;

    Ok(SensorSample {
        id: SampleId(row.try_get::<Uuid, _>("id").map_err(persistence)?),
        run_id: RunId(row.try_get::<Uuid, _>("run_id").map_err(persistence)?),
        vehicle_id: VehicleId(
            row.try_get::<Uuid, _>("vehicle_id").map_err(persistence)?,
        ),
        user_id: UserId(row.try_get::<Uuid, _>("user_id").map_err(persistence)?),
        timestamp: row.try_get("observed_at").map_err(persistence)?,
        frame_index: row.try_get::<i32, _>("frame_index").map_err(persistence)?
            as u32,
        track_id: row
            .try_get::<Option<i64>, _>("track_id")
            .map_err(persistence)?
            .map(TrackId),
        speed: row.try_get("speed").map_err(persistence)?,
        distance_to_object: row
            .try_get("distance_to_object")
            .map_err(persistence)?,
        lane_status: LaneStatus::from_str(&lane_status)
            .map_err(|e| CoreError::persistence(e.to_string()))?,
        obstacle_detected: row.try_get("obstacle_detected").map_err(persistence)?,
        ttc: row.try_get("ttc").map_err(persistence)?,
        camera_frame_url: row.try_get("camera_frame_url").map_err(persistence)?,
    })
}

fn alert_from_row(row: &PgRow) -> Result<Alert> {
    let alert_type: String = row.try_get("alert_type").map_err(persistence)?;
    let severity: String = row.try_get("severity").map_err(persistence)?;

    Ok(Alert {
        id: AlertId(row.try_get::<Uuid, _>("id").map_err(persistence)?),
        run_id: RunId(row.try_get::<Uuid, _>("run_id").map_err(persistence)?),
        vehicle_id: VehicleId(
            row.try_get::<Uuid, _>("vehicle_id").map_err(persistence)?,
        ),
        user_id: UserId(row.try_get::<Uuid, _>("user_id").map_err(persistence)?),
        alert_type: AlertType::from_str(&alert_type)
            .map_err(|e| CoreError::persistence(e.to_string()))?,
        severity: Severity::from_str(&severity)
            .map_err(|e| CoreError::persistence(e.to_string()))?,
        description: row.try_get("description").map_err(persistence)?,
        track_id: row
            .try_get::<Option<i64>, _>("track_id")
            .map_err(persistence)?
            .map(TrackId),
        sample_id: row
            .try_get::<Option<Uuid>, _>("sample_id")
            .map_err(persistence)?
            .map(SampleId),
        created_at: row.try_get("created_at").map_err(persistence)?,
    })
}

#[async_trait]
impl RunStore for PostgresRunStore {
    async fn insert_run(&self, run: Run) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO runs (
                id, vehicle_id, user_id, filename, filepath, file_type,
                status, total_alerts, collision_count, lane_departure_count,
                obstacle_count, traffic_sign_count, sensor_sample_count,
                video_ref, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    $14, $15, $16)
            "#,
        )
        .bind(run.id.to_uuid())
        .bind(run.vehicle_id.to_uuid())
        .bind(run.user_id.to_uuid())
        .bind(&run.filename)
        .bind(&run.filepath)
        .bind(run.file_type.as_str())
        .bind(run.status.as_str())
        .bind(run.summary.total_alerts as i32)
        .bind(run.summary.collision_count as i32)
        .bind(run.summary.lane_departure_count as i32)
        .bind(run.summary.obstacle_count as i32)
        .bind(run.summary.traffic_sign_count as i32)
        .bind(run.sensor_sample_count as i32)
        .bind(&run.video_ref)
        .bind(run.created_at)
        .bind(run.updated_at)
        .execute(&self.pool)
        .await
        .map_err(persistence)?;

        Ok(())
    }

    async fn get_run(&self, run_id: RunId) -> Result<Option<Run>> {
        let row = sqlx::query("SELECT * FROM runs WHERE id = $1")
            .bind(run_id.to_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence)?;

        row.as_ref().map(run_from_row).transpose()
    }

    async fn insert_samples(
        &self,
        samples: Vec<SensorSample>,
    ) -> Result<BulkOutcome> {
        let mut outcome = BulkOutcome::default();

        for (index, sample) in samples.into_iter().enumerate() {
            let result = sqlx::query(
                r#"
                INSERT INTO sensor_samples (
                    id, run_id, vehicle_id, user_id, observed_at,
                    frame_index, track_id, speed, distance_to_object,
                    lane_status, obstacle_detected, ttc, camera_frame_url
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                        $13)
                "#,
            )
            .bind(sample.id.to_uuid())
            .bind(sample.run_id.to_uuid())
            .bind(sample.vehicle_id.to_uuid())
            .bind(sample.user_id.to_uuid())
            .bind(sample.timestamp)
            .bind(sample.frame_index as i32)
            .bind(sample.track_id.map(|t| t.value()))
            .bind(sample.speed)
            .bind(sample.distance_to_object)
            .bind(sample.lane_status.as_str())
            .bind(sample.obstacle_detected)
            .bind(sample.ttc)
            .bind(&sample.camera_frame_url)
            .execute(&self.pool)
            .await;

            match result {
                Ok(_) => outcome.accepted.push(sample.id.to_uuid()),
                Err(e) => match rejection_reason(&e) {
                    Some(reason) => {
                        warn!(index, %reason, "sample rejected during bulk insert");
                        outcome.rejected.push(RejectedRecord { index, reason });
                    }
                    None => return Err(persistence(e)),
                },
            }
        }

        Ok(outcome)
    }

    async fn insert_alerts(&self, alerts: Vec<Alert>) -> Result<BulkOutcome> {
        let mut outcome = BulkOutcome::default();

        for (index, alert) in alerts.into_iter().enumerate() {
            let result = sqlx::query(
                r#"
                INSERT INTO alerts (
                    id, run_id, vehicle_id, user_id, alert_type, severity,
                    description, track_id, sample_id, created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(alert.id.to_uuid())
            .bind(alert.run_id.to_uuid())
            .bind(alert.vehicle_id.to_uuid())
            .bind(alert.user_id.to_uuid())
            .bind(alert.alert_type.as_str())
            .bind(alert.severity.as_str())
            .bind(&alert.description)
            .bind(alert.track_id.map(|t| t.value()))
            .bind(alert.sample_id.map(|s| s.to_uuid()))
            .bind(alert.created_at)
            .execute(&self.pool)
            .await;

            match result {
                Ok(_) => outcome.accepted.push(alert.id.to_uuid()),
                Err(e) => match rejection_reason(&e) {
                    Some(reason) => {
                        warn!(index, %reason, "alert rejected during bulk insert");
                        outcome.rejected.push(RejectedRecord { index, reason });
                    }
                    None => return Err(persistence(e)),
                },
            }
        }

        Ok(outcome)
    }

    async fn update_alert_correlation(
        &self,
        alert_id: AlertId,
        sample_id: SampleId,
    ) -> Result<()> {
        let result =
            sqlx::query("UPDATE alerts SET sample_id = $1 WHERE id = $2")
                .bind(sample_id.to_uuid())
                .bind(alert_id.to_uuid())
                .execute(&self.pool)
                .await
                .map_err(persistence)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::not_found(format!(
                "alert {alert_id} not found"
            )));
        }
        Ok(())
    }

    async fn update_run_status(
        &self,
        run_id: RunId,
        status: RunStatus,
    ) -> Result<Run> {
        let row = sqlx::query(
            r#"
            UPDATE runs SET status = $1, updated_at = now()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(status.as_str())
        .bind(run_id.to_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence)?
        .ok_or_else(|| {
            CoreError::not_found(format!("run {run_id} not found"))
        })?;

        run_from_row(&row)
    }

    async fn update_run_result(
        &self,
        run_id: RunId,
        update: RunResultUpdate,
    ) -> Result<Run> {
        let row = sqlx::query(
            r#"
            UPDATE runs SET
                status = $1,
                total_alerts = $2,
                collision_count = $3,
                lane_departure_count = $4,
                obstacle_count = $5,
                traffic_sign_count = $6,
                sensor_sample_count = $7,
                video_ref = $8,
                updated_at = now()
            WHERE id = $9
            RETURNING *
            "#,
        )
        .bind(update.status.as_str())
        .bind(update.summary.total_alerts as i32)
        .bind(update.summary.collision_count as i32)
        .bind(update.summary.lane_departure_count as i32)
        .bind(update.summary.obstacle_count as i32)
        .bind(update.summary.traffic_sign_count as i32)
        .bind(update.sensor_sample_count as i32)
        .bind(&update.video_ref)
        .bind(run_id.to_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence)?
        .ok_or_else(|| {
            CoreError::not_found(format!("run {run_id} not found"))
        })?;

        run_from_row(&row)
    }

    async fn video_ref(&self, run_id: RunId) -> Result<String> {
        let row = sqlx::query("SELECT video_ref FROM runs WHERE id = $1")
            .bind(run_id.to_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence)?
            .ok_or_else(|| {
                CoreError::not_found(format!("run {run_id} not found"))
            })?;

        row.try_get::<Option<String>, _>("video_ref")
            .map_err(persistence)?
            .ok_or_else(|| {
                CoreError::not_found(format!("run {run_id} has no video"))
            })
    }

    async fn count_samples(&self, run_id: RunId) -> Result<u32> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM sensor_samples WHERE run_id = $1",
        )
        .bind(run_id.to_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(persistence)?;

        Ok(row.try_get::<i64, _>("count").map_err(persistence)? as u32)
    }

    async fn samples_for_run(
        &self,
        run_id: RunId,
    ) -> Result<Vec<SensorSample>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM sensor_samples
            WHERE run_id = $1
            ORDER BY frame_index ASC
            "#,
        )
        .bind(run_id.to_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)?;

        rows.iter().map(sample_from_row).collect()
    }

    async fn alerts_for_run(&self, run_id: RunId) -> Result<Vec<Alert>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM alerts
            WHERE run_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(run_id.to_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)?;

        rows.iter().map(alert_from_row).collect()
    }
}
