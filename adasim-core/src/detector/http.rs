//! Reqwest-backed detector client.

use crate::detector::{DetectorClient, DetectorResponse, ProcessRequest};
use crate::error::{CoreError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP client for the detector's `POST /process` endpoint.
///
/// Every request carries a bounded timeout so a slow detector cannot
/// hang the ingestion request indefinitely.
#[derive(Debug, Clone)]
pub struct HttpDetectorClient {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpDetectorClient {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self> {
        let endpoint = base_url.join("process").map_err(|e| {
            CoreError::validation(format!("invalid detector URL: {e}"))
        })?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                CoreError::upstream(format!("detector client setup failed: {e}"))
            })?;

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl DetectorClient for HttpDetectorClient {
    async fn process(
        &self,
        request: ProcessRequest,
    ) -> Result<DetectorResponse> {
        debug!(run_id = %request.run_id, "dispatching detector request");

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                CoreError::upstream(format!("detector request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(CoreError::upstream(format!(
                "detector returned {status}: {detail}"
            )));
        }

        response.json::<DetectorResponse>().await.map_err(|e| {
            CoreError::upstream(format!("unusable detector payload: {e}"))
        })
    }
}
