use crate::error::ModelError;
use crate::ids::{RunId, SampleId, TrackId, UserId, VehicleId};
use chrono::{DateTime, Utc};

/// Lane position reported for one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum LaneStatus {
    Within,
    Departing,
    Crossed,
    Lost,
}

impl LaneStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LaneStatus::Within => "within",
            LaneStatus::Departing => "departing",
            LaneStatus::Crossed => "crossed",
            LaneStatus::Lost => "lost",
        }
    }
}

impl std::str::FromStr for LaneStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "within" => Ok(LaneStatus::Within),
            "departing" => Ok(LaneStatus::Departing),
            "crossed" => Ok(LaneStatus::Crossed),
            "lost" => Ok(LaneStatus::Lost),
            other => Err(ModelError::invalid("lane_status", other)),
        }
    }
}

impl std::fmt::Display for LaneStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One timestamped observation emitted by the detector for a run.
///
/// Samples are created in bulk during ingestion and never updated
/// afterward.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorSample {
    pub id: SampleId,
    pub run_id: RunId,
    pub vehicle_id: VehicleId,
    pub user_id: UserId,
    pub timestamp: DateTime<Utc>,
    /// Monotonically increasing position within the run's processed
    /// sequence.
    pub frame_index: u32,
    #[cfg_attr(
        feature = "serde",
        serde(skip_serializing_if = "Option::is_none")
    )]
    pub track_id: Option<TrackId>,
    /// Relative velocity; may be negative.
    #[cfg_attr(
        feature = "serde",
        serde(skip_serializing_if = "Option::is_none")
    )]
    pub speed: Option<f64>,
    #[cfg_attr(
        feature = "serde",
        serde(skip_serializing_if = "Option::is_none")
    )]
    pub distance_to_object: Option<f64>,
    pub lane_status: LaneStatus,
    pub obstacle_detected: bool,
    /// Detector-estimated time to collision, seconds.
    #[cfg_attr(
        feature = "serde",
        serde(skip_serializing_if = "Option::is_none")
    )]
    pub ttc: Option<f64>,
    #[cfg_attr(
        feature = "serde",
        serde(skip_serializing_if = "Option::is_none")
    )]
    pub camera_frame_url: Option<String>,
}
