use crate::error::ModelError;
use crate::ids::{AlertId, RunId, SampleId, TrackId, UserId, VehicleId};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AlertType {
    Collision,
    LaneDeparture,
    Obstacle,
    TrafficSign,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Collision => "collision",
            AlertType::LaneDeparture => "lane_departure",
            AlertType::Obstacle => "obstacle",
            AlertType::TrafficSign => "traffic_sign",
        }
    }
}

impl std::str::FromStr for AlertType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "collision" => Ok(AlertType::Collision),
            "lane_departure" => Ok(AlertType::LaneDeparture),
            "obstacle" => Ok(AlertType::Obstacle),
            "traffic_sign" => Ok(AlertType::TrafficSign),
            other => Err(ModelError::invalid("type", other)),
        }
    }
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            other => Err(ModelError::invalid("severity", other)),
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A warning derived from detector output during one run.
///
/// `sample_id` is the correlated-sample reference: if set, it points at a
/// [`crate::SensorSample`] of the same run and the same track. It is the
/// only field mutated after creation, and only once.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Alert {
    pub id: AlertId,
    pub run_id: RunId,
    pub vehicle_id: VehicleId,
    pub user_id: UserId,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub alert_type: AlertType,
    pub severity: Severity,
    pub description: String,
    #[cfg_attr(
        feature = "serde",
        serde(skip_serializing_if = "Option::is_none")
    )]
    pub track_id: Option<TrackId>,
    #[cfg_attr(
        feature = "serde",
        serde(skip_serializing_if = "Option::is_none")
    )]
    pub sample_id: Option<SampleId>,
    pub created_at: DateTime<Utc>,
}
