//! HTTP implementation of [`AssetReporter`] for workers running outside
//! the orchestrator process.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use super::reporter::{Acknowledgement, AssetReporter, ReportError};

/// Reports asset progress to the server's `/api/v1/assets` callbacks.
#[derive(Debug, Clone)]
pub struct HttpAssetReporter {
    client: Client,
    base_url: String,
}

impl HttpAssetReporter {
    /// Create a reporter for the server at `base_url`
    /// (e.g. "http://127.0.0.1:3000").
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ReportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReportError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, asset_id: &str, action: Option<&str>) -> String {
        match action {
            Some(action) => format!("{}/api/v1/assets/{}/{}", self.base_url, asset_id, action),
            None => format!("{}/api/v1/assets/{}", self.base_url, asset_id),
        }
    }

    async fn post(&self, asset_id: &str, action: &str) -> Result<Acknowledgement, ReportError> {
        let url = self.url(asset_id, Some(action));
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| ReportError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::OK => {
                // The upload callback replies with an empty object
                let body: serde_json::Value = response
                    .json()
                    .await
                    .map_err(|e| ReportError::Transport(e.to_string()))?;
                let acknowledged = body
                    .get("acknowledged")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(true);
                Ok(Acknowledgement { acknowledged })
            }
            StatusCode::NOT_FOUND => Ok(Acknowledgement::rejected()),
            StatusCode::SERVICE_UNAVAILABLE => Err(ReportError::Transient(format!(
                "{} {} for {}",
                action,
                StatusCode::SERVICE_UNAVAILABLE,
                asset_id
            ))),
            status => Err(ReportError::Transport(format!(
                "unexpected status {} from {}",
                status, url
            ))),
        }
    }
}

#[async_trait]
impl AssetReporter for HttpAssetReporter {
    async fn asset_exists(&self, asset_id: &str) -> Result<bool, ReportError> {
        let response = self
            .client
            .get(self.url(asset_id, None))
            .send()
            .await
            .map_err(|e| ReportError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(ReportError::Transport(format!(
                "unexpected status {} looking up asset {}",
                status, asset_id
            ))),
        }
    }

    async fn report_started(&self, asset_id: &str) -> Result<Acknowledgement, ReportError> {
        self.post(asset_id, "processing-started").await
    }

    async fn report_heartbeat(&self, asset_id: &str) -> Result<Acknowledgement, ReportError> {
        self.post(asset_id, "report-health").await
    }

    async fn report_finished(&self, asset_id: &str) -> Result<Acknowledgement, ReportError> {
        self.post(asset_id, "upload").await
    }
}
