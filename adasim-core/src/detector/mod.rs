//! Client port for the external detection service.

pub mod http;
pub mod payload;

pub use http::HttpDetectorClient;
pub use payload::{DetectorResponse, Normalized, normalize};

use crate::error::Result;
use adasim_model::{RunId, UserId, VehicleId};
use async_trait::async_trait;
use serde::Serialize;

/// Request submitted to the detector for one run's stored asset.
///
/// Field names follow the detector's wire schema.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    /// Absolute path of the stored asset, resolvable by the detector.
    #[serde(rename = "filepath")]
    pub asset_path: String,
    pub vehicle_id: VehicleId,
    #[serde(rename = "simulationId")]
    pub run_id: RunId,
    pub user_id: UserId,
}

/// The external analysis process. Opaque, potentially slow, potentially
/// failing; every failure mode surfaces as
/// [`crate::CoreError::UpstreamProcessing`].
#[async_trait]
pub trait DetectorClient: Send + Sync {
    async fn process(&self, request: ProcessRequest)
    -> Result<DetectorResponse>;
}
