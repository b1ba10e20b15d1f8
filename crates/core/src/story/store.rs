//! Story storage trait and query filter.

use crate::store::StoreError;

use super::{Story, StoryStatus};

/// Filter for querying stories.
///
/// An empty filter matches every story.
#[derive(Debug, Clone, Default)]
pub struct StoryFilter {
    /// Only stories in one of these statuses.
    pub statuses: Option<Vec<StoryStatus>>,
    /// Skip stories in this status.
    pub excluded_status: Option<StoryStatus>,
    /// Only stories requiring this asset id.
    pub asset_id: Option<String>,
}

impl StoryFilter {
    /// Create a filter matching everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to the given statuses.
    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = StoryStatus>) -> Self {
        self.statuses = Some(statuses.into_iter().collect());
        self
    }

    /// Exclude one status.
    pub fn excluding_status(mut self, status: StoryStatus) -> Self {
        self.excluded_status = Some(status);
        self
    }

    /// Restrict to stories requiring an asset.
    pub fn requiring_asset(mut self, asset_id: impl Into<String>) -> Self {
        self.asset_id = Some(asset_id.into());
        self
    }

    /// Stories that currently hold a reference on `asset_id`: every
    /// non-idle story requiring it.
    pub fn referencing(asset_id: impl Into<String>) -> Self {
        Self::new()
            .excluding_status(StoryStatus::Idle)
            .requiring_asset(asset_id)
    }

    /// Whether a story passes this filter.
    pub fn matches(&self, story: &Story) -> bool {
        if let Some(ref statuses) = self.statuses {
            if !statuses.contains(&story.status) {
                return false;
            }
        }
        if self.excluded_status == Some(story.status) {
            return false;
        }
        if let Some(ref asset_id) = self.asset_id {
            if !story.requires(asset_id) {
                return false;
            }
        }
        true
    }
}

/// Trait for story storage backends.
///
/// Reads return snapshots. `update_status` is the only mutation after
/// insertion; it refreshes `status_changed_at`, publishes a change
/// notification on success, and may fail with
/// [`StoreError::TransientFault`] leaving the story untouched.
pub trait StoryStore: Send + Sync {
    /// Insert (or replace) a story.
    fn insert(&self, story: Story) -> Result<(), StoreError>;

    /// Get a story by id.
    fn get(&self, id: &str) -> Result<Option<Story>, StoreError>;

    /// List stories matching the filter, ordered by id.
    fn list(&self, filter: &StoryFilter) -> Result<Vec<Story>, StoreError>;

    /// Set a story's status.
    fn update_status(&self, id: &str, status: StoryStatus) -> Result<Story, StoreError>;
}
