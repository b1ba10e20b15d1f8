//! Core story data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a story.
///
/// Exactly one status per story. `Downloading`, `Canceling` and `Cleaning`
/// are owned by the orchestrator loop; everything else may be written by
/// commands.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StoryStatus {
    Idle,
    Scheduled,
    Downloading,
    Canceling,
    ScheduledCleaning,
    Cleaning,
    Downloaded,
    Error,
}

impl StoryStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [StoryStatus; 8] = [
        StoryStatus::Idle,
        StoryStatus::Scheduled,
        StoryStatus::Downloading,
        StoryStatus::Canceling,
        StoryStatus::ScheduledCleaning,
        StoryStatus::Cleaning,
        StoryStatus::Downloaded,
        StoryStatus::Error,
    ];

    /// Returns the status as a string for filtering and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            StoryStatus::Idle => "idle",
            StoryStatus::Scheduled => "scheduled",
            StoryStatus::Downloading => "downloading",
            StoryStatus::Canceling => "canceling",
            StoryStatus::ScheduledCleaning => "scheduled_cleaning",
            StoryStatus::Cleaning => "cleaning",
            StoryStatus::Downloaded => "downloaded",
            StoryStatus::Error => "error",
        }
    }

    /// Parse a status from its string form.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }

    /// Statuses held exclusively by a running orchestrator workflow.
    ///
    /// Finding one of these at the top of a loop iteration means the
    /// workflow that owned it is gone.
    pub fn is_exclusive(&self) -> bool {
        matches!(
            self,
            StoryStatus::Downloading | StoryStatus::Cleaning | StoryStatus::Canceling
        )
    }

    /// Statuses waiting to be picked up by the scheduler.
    pub fn is_pending(&self) -> bool {
        matches!(self, StoryStatus::Scheduled | StoryStatus::ScheduledCleaning)
    }
}

impl std::fmt::Display for StoryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A composite work item built from shared assets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Story {
    /// Unique identifier.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Current lifecycle status.
    pub status: StoryStatus,
    /// When `status` last changed.
    pub status_changed_at: DateTime<Utc>,
    /// Asset ids this story needs. Fixed at creation.
    pub required_asset_ids: Vec<String>,
}

impl Story {
    /// Create an idle story.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        required_asset_ids: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            status: StoryStatus::Idle,
            status_changed_at: Utc::now(),
            required_asset_ids,
        }
    }

    /// Whether this story lists the given asset among its requirements.
    pub fn requires(&self, asset_id: &str) -> bool {
        self.required_asset_ids.iter().any(|id| id == asset_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in StoryStatus::ALL {
            assert_eq!(StoryStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(StoryStatus::parse("not_downloaded"), None);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&StoryStatus::ScheduledCleaning).unwrap();
        assert_eq!(json, "\"scheduled_cleaning\"");
    }

    #[test]
    fn test_exclusive_and_pending_groups() {
        let exclusive: Vec<_> = StoryStatus::ALL
            .into_iter()
            .filter(StoryStatus::is_exclusive)
            .collect();
        assert_eq!(
            exclusive,
            vec![
                StoryStatus::Downloading,
                StoryStatus::Canceling,
                StoryStatus::Cleaning
            ]
        );

        let pending: Vec<_> = StoryStatus::ALL
            .into_iter()
            .filter(StoryStatus::is_pending)
            .collect();
        assert_eq!(
            pending,
            vec![StoryStatus::Scheduled, StoryStatus::ScheduledCleaning]
        );
    }

    #[test]
    fn test_new_story_is_idle() {
        let story = Story::new("story-1", "Story 1", vec!["asset-1".to_string()]);
        assert_eq!(story.status, StoryStatus::Idle);
        assert!(story.requires("asset-1"));
        assert!(!story.requires("asset-2"));
    }
}
