//! Detector payload parsing and per-record normalization.
//!
//! The detector's response is parsed loosely (every record field
//! optional) and then normalized into the internal shapes one record at
//! a time. A record that fails structural validation is dropped with a
//! reason; the rest of the batch is unaffected.

use adasim_model::{
    Alert, AlertId, AlertType, LaneStatus, Run, RunStatus, SampleId,
    SensorSample, Severity, TrackId,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::str::FromStr;

/// Raw detector response. `summary` is carried only for logging; the
/// run's committed summary is recomputed from the alerts the store
/// actually accepted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetectorResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub summary: Option<serde_json::Value>,
    #[serde(default, rename = "sensorData")]
    pub sensor_data: Vec<RawSample>,
    #[serde(default)]
    pub alerts: Vec<RawAlert>,
    #[serde(default, rename = "videoUrl")]
    pub video_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSample {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub frame_index: Option<i64>,
    #[serde(default)]
    pub track_id: Option<i64>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub distance_to_object: Option<f64>,
    #[serde(default)]
    pub lane_status: Option<String>,
    #[serde(default)]
    pub obstacle_detected: Option<bool>,
    #[serde(default)]
    pub ttc: Option<f64>,
    #[serde(default)]
    pub camera_frame_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAlert {
    #[serde(default, rename = "type")]
    pub alert_type: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub track_id: Option<i64>,
}

/// Result of normalizing a detector response against a run.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub samples: Vec<SensorSample>,
    pub alerts: Vec<Alert>,
    pub rejected_samples: Vec<(usize, String)>,
    pub rejected_alerts: Vec<(usize, String)>,
    /// Terminal status the detector explicitly reported, if any.
    pub reported_status: Option<RunStatus>,
    pub video_ref: Option<String>,
}

fn normalize_sample(
    raw: RawSample,
    run: &Run,
) -> Result<SensorSample, String> {
    let timestamp = raw
        .timestamp
        .as_deref()
        .ok_or_else(|| "missing timestamp".to_string())
        .and_then(parse_timestamp)?;

    let frame_index = match raw.frame_index {
        Some(idx) if idx >= 0 => idx as u32,
        Some(idx) => return Err(format!("negative frame_index {idx}")),
        None => return Err("missing frame_index".to_string()),
    };

    if let Some(distance) = raw.distance_to_object
        && distance < 0.0
    {
        return Err(format!("negative distance_to_object {distance}"));
    }

    // Absent lane status defaults to `within`; an illegal value rejects
    // the record.
    let lane_status = match raw.lane_status.as_deref() {
        None => LaneStatus::Within,
        Some(s) => LaneStatus::from_str(s).map_err(|e| e.to_string())?,
    };

    Ok(SensorSample {
        id: SampleId::new(),
        run_id: run.id,
        vehicle_id: run.vehicle_id,
        user_id: run.user_id,
        timestamp,
        frame_index,
        track_id: raw.track_id.map(TrackId),
        speed: raw.speed,
        distance_to_object: raw.distance_to_object,
        lane_status,
        obstacle_detected: raw.obstacle_detected.unwrap_or(false),
        ttc: raw.ttc,
        camera_frame_url: raw.camera_frame_url,
    })
}

fn normalize_alert(raw: RawAlert, run: &Run) -> Result<Alert, String> {
    let alert_type = raw
        .alert_type
        .as_deref()
        .ok_or_else(|| "missing type".to_string())
        .and_then(|s| AlertType::from_str(s).map_err(|e| e.to_string()))?;

    let severity = raw
        .severity
        .as_deref()
        .ok_or_else(|| "missing severity".to_string())
        .and_then(|s| Severity::from_str(s).map_err(|e| e.to_string()))?;

    let description = match raw.description {
        Some(d) if !d.trim().is_empty() => d,
        _ => return Err("missing description".to_string()),
    };

    Ok(Alert {
        id: AlertId::new(),
        run_id: run.id,
        vehicle_id: run.vehicle_id,
        user_id: run.user_id,
        alert_type,
        severity,
        description,
        track_id: raw.track_id.map(TrackId),
        sample_id: None,
        created_at: Utc::now(),
    })
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("unparseable timestamp {raw:?}: {e}"))
}

/// Normalize a detector response for `run`, validating per record.
pub fn normalize(response: DetectorResponse, run: &Run) -> Normalized {
    let mut normalized = Normalized {
        reported_status: response
            .status
            .as_deref()
            .and_then(|s| RunStatus::from_str(s).ok())
            .filter(RunStatus::is_terminal),
        video_ref: response.video_url,
        ..Normalized::default()
    };

    for (index, raw) in response.sensor_data.into_iter().enumerate() {
        match normalize_sample(raw, run) {
            Ok(sample) => normalized.samples.push(sample),
            Err(reason) => normalized.rejected_samples.push((index, reason)),
        }
    }

    for (index, raw) in response.alerts.into_iter().enumerate() {
        match normalize_alert(raw, run) {
            Ok(alert) => normalized.alerts.push(alert),
            Err(reason) => normalized.rejected_alerts.push((index, reason)),
        }
    }

    normalized
}
