//! External download/cancel/clean requests.
//!
//! Commands only set a status. They never validate the story's current
//! state beyond the cancel special case; the scheduler loop discards work
//! that went stale.

use std::sync::Arc;

use tracing::{debug, info};

use crate::store::StoreError;
use crate::story::{Story, StoryStatus, StoryStore};

/// Translates user commands into story status transitions.
#[derive(Clone)]
pub struct CommandHandler {
    stories: Arc<dyn StoryStore>,
}

impl CommandHandler {
    pub fn new(stories: Arc<dyn StoryStore>) -> Self {
        Self { stories }
    }

    /// Queue a story for download, whatever its current status.
    ///
    /// Returns `None` when the story does not exist.
    pub fn schedule_download(&self, story_id: &str) -> Result<Option<Story>, StoreError> {
        self.transition(story_id, "download", |_| StoryStatus::Scheduled)
    }

    /// Cancel a story's download.
    ///
    /// A downloading story moves to `canceling` so the running workflow can
    /// stop its workers; anything else goes straight back to `idle`.
    pub fn cancel_download(&self, story_id: &str) -> Result<Option<Story>, StoreError> {
        self.transition(story_id, "cancel", |current| match current {
            StoryStatus::Downloading => StoryStatus::Canceling,
            _ => StoryStatus::Idle,
        })
    }

    /// Queue a story for cleaning, whatever its current status.
    pub fn schedule_clean(&self, story_id: &str) -> Result<Option<Story>, StoreError> {
        self.transition(story_id, "clean", |_| StoryStatus::ScheduledCleaning)
    }

    fn transition(
        &self,
        story_id: &str,
        command: &str,
        next: impl FnOnce(StoryStatus) -> StoryStatus,
    ) -> Result<Option<Story>, StoreError> {
        let Some(story) = self.stories.get(story_id)? else {
            debug!("Story {} not found, skipping {}", story_id, command);
            return Ok(None);
        };

        let status = next(story.status);
        match self.stories.update_status(story_id, status) {
            Ok(updated) => {
                info!("Story {} {} -> {}", story_id, command, status);
                Ok(Some(updated))
            }
            // Removed between the read and the write
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
