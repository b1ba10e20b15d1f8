//! Orchestrator side of the worker callbacks.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::asset::AssetStore;
use crate::store::StoreError;
use crate::worker::{Acknowledgement, AssetReporter, ReportError};

/// Applies worker progress reports to the asset store.
///
/// A report for a record that no longer exists is answered with a
/// negative acknowledgement; the worker is expected to give up.
#[derive(Clone)]
pub struct AssetReporting {
    assets: Arc<dyn AssetStore>,
}

impl AssetReporting {
    pub fn new(assets: Arc<dyn AssetStore>) -> Self {
        Self { assets }
    }

    /// A worker picked up the asset.
    pub fn processing_started(&self, asset_id: &str) -> Result<Acknowledgement, StoreError> {
        acknowledge(asset_id, "processing_started", self.assets.mark_started(asset_id))
    }

    /// A worker is still alive.
    pub fn report_health(&self, asset_id: &str) -> Result<Acknowledgement, StoreError> {
        acknowledge(asset_id, "report_health", self.assets.record_heartbeat(asset_id))
    }

    /// A worker finished and uploaded the asset.
    pub fn upload(&self, asset_id: &str) -> Result<Acknowledgement, StoreError> {
        acknowledge(asset_id, "upload", self.assets.mark_finished(asset_id))
    }

    /// Whether a processing record exists for the asset.
    pub fn exists(&self, asset_id: &str) -> Result<bool, StoreError> {
        Ok(self.assets.get(asset_id)?.is_some())
    }
}

fn acknowledge<T>(
    asset_id: &str,
    callback: &str,
    result: Result<T, StoreError>,
) -> Result<Acknowledgement, StoreError> {
    match result {
        Ok(_) => Ok(Acknowledgement::accepted()),
        Err(StoreError::NotFound(_)) => {
            debug!("{} for unknown asset {}", callback, asset_id);
            Ok(Acknowledgement::rejected())
        }
        Err(e) => Err(e),
    }
}

impl From<StoreError> for ReportError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::TransientFault(_) => ReportError::Transient(err.to_string()),
            other => ReportError::Transport(other.to_string()),
        }
    }
}

#[async_trait]
impl AssetReporter for AssetReporting {
    async fn asset_exists(&self, asset_id: &str) -> Result<bool, ReportError> {
        Ok(self.exists(asset_id)?)
    }

    async fn report_started(&self, asset_id: &str) -> Result<Acknowledgement, ReportError> {
        Ok(self.processing_started(asset_id)?)
    }

    async fn report_heartbeat(&self, asset_id: &str) -> Result<Acknowledgement, ReportError> {
        Ok(self.report_health(asset_id)?)
    }

    async fn report_finished(&self, asset_id: &str) -> Result<Acknowledgement, ReportError> {
        Ok(self.upload(asset_id)?)
    }
}
