//! In-memory asset record store.

use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::Utc;

use crate::store::{FaultInjector, StoreError};

use super::{AssetRecord, AssetStore};

/// Asset store backed by a lock-guarded map.
#[derive(Debug, Default)]
pub struct InMemoryAssetStore {
    records: RwLock<BTreeMap<String, AssetRecord>>,
    faults: FaultInjector,
}

impl InMemoryAssetStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject transient faults into mutations.
    pub fn with_faults(mut self, faults: FaultInjector) -> Self {
        self.faults = faults;
        self
    }

    fn modify(
        &self,
        id: &str,
        operation: &str,
        apply: impl FnOnce(&mut AssetRecord),
    ) -> Result<AssetRecord, StoreError> {
        let mut records = self.records.write()?;
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        self.faults.check(operation)?;
        apply(record);
        Ok(record.clone())
    }
}

impl AssetStore for InMemoryAssetStore {
    fn get(&self, id: &str) -> Result<Option<AssetRecord>, StoreError> {
        Ok(self.records.read()?.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<AssetRecord>, StoreError> {
        Ok(self.records.read()?.values().cloned().collect())
    }

    fn create(&self, id: &str) -> Result<AssetRecord, StoreError> {
        let mut records = self.records.write()?;
        self.faults.check("create_asset")?;
        let record = AssetRecord::new(id);
        records.insert(id.to_string(), record.clone());
        Ok(record)
    }

    fn mark_started(&self, id: &str) -> Result<AssetRecord, StoreError> {
        self.modify(id, "mark_started", |record| {
            record.started = true;
            record.last_heartbeat_at = Utc::now();
        })
    }

    fn record_heartbeat(&self, id: &str) -> Result<AssetRecord, StoreError> {
        self.modify(id, "record_heartbeat", |record| {
            record.last_heartbeat_at = Utc::now();
        })
    }

    fn mark_finished(&self, id: &str) -> Result<AssetRecord, StoreError> {
        self.modify(id, "mark_finished", |record| {
            record.started = true;
            record.finished = true;
        })
    }

    fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut records = self.records.write()?;
        self.faults.check("delete_asset")?;
        Ok(records.remove(id).is_some())
    }
}
