//! Asset record storage trait.

use crate::store::StoreError;

use super::AssetRecord;

/// Trait for asset record storage backends.
///
/// Records are keyed globally by asset id. Worker-facing mutations fail
/// with [`StoreError::NotFound`] once the record has been deleted, and may
/// fail with [`StoreError::TransientFault`].
pub trait AssetStore: Send + Sync {
    /// Get a record by asset id.
    fn get(&self, id: &str) -> Result<Option<AssetRecord>, StoreError>;

    /// List all records, ordered by id.
    fn list(&self) -> Result<Vec<AssetRecord>, StoreError>;

    /// Create a fresh record, replacing any existing one for the same id.
    fn create(&self, id: &str) -> Result<AssetRecord, StoreError>;

    /// Mark a record started and refresh its heartbeat.
    fn mark_started(&self, id: &str) -> Result<AssetRecord, StoreError>;

    /// Refresh a record's heartbeat.
    fn record_heartbeat(&self, id: &str) -> Result<AssetRecord, StoreError>;

    /// Mark a record finished.
    fn mark_finished(&self, id: &str) -> Result<AssetRecord, StoreError>;

    /// Delete a record. Returns whether one existed.
    fn delete(&self, id: &str) -> Result<bool, StoreError>;
}
