use crate::error::ModelError;
use crate::ids::{RunId, UserId, VehicleId};
use chrono::{DateTime, Utc};

/// Processing state of a run. Moves `Pending -> Completed` or
/// `Pending -> Failed` exactly once per ingestion attempt; never reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum RunStatus {
    Pending,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }
}

impl std::str::FromStr for RunStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RunStatus::Pending),
            "completed" => Ok(RunStatus::Completed),
            "failed" => Ok(RunStatus::Failed),
            other => Err(ModelError::invalid("status", other)),
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of asset uploaded for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FileType {
    Image,
    Video,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Image => "image",
            FileType::Video => "video",
        }
    }
}

impl std::str::FromStr for FileType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(FileType::Image),
            "video" => Ok(FileType::Video),
            other => Err(ModelError::invalid("file_type", other)),
        }
    }
}

/// Aggregate alert counts for a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunSummary {
    pub total_alerts: u32,
    pub collision_count: u32,
    pub lane_departure_count: u32,
    pub obstacle_count: u32,
    pub traffic_sign_count: u32,
}

/// One uploaded asset's end-to-end detection attempt.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Run {
    pub id: RunId,
    pub vehicle_id: VehicleId,
    pub user_id: UserId,
    pub filename: String,
    pub filepath: String,
    pub file_type: FileType,
    pub status: RunStatus,
    pub summary: RunSummary,
    /// Number of sample rows that actually exist in the store for this
    /// run. May be less than what the detector reported.
    pub sensor_sample_count: u32,
    #[cfg_attr(
        feature = "serde",
        serde(skip_serializing_if = "Option::is_none")
    )]
    pub video_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Run {
    /// Whether `caller_id` owns this run.
    pub fn is_owned_by(&self, caller_id: &UserId) -> bool {
        &self.user_id == caller_id
    }
}
