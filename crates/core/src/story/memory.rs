//! In-memory story store.

use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::Utc;

use crate::events::StoryEvents;
use crate::store::{FaultInjector, StoreError};

use super::{Story, StoryFilter, StoryStatus, StoryStore};

/// Story store backed by a lock-guarded map. Lives as long as the process.
#[derive(Debug, Default)]
pub struct InMemoryStoryStore {
    stories: RwLock<BTreeMap<String, Story>>,
    faults: FaultInjector,
    events: Option<StoryEvents>,
}

impl InMemoryStoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject transient faults into status updates.
    pub fn with_faults(mut self, faults: FaultInjector) -> Self {
        self.faults = faults;
        self
    }

    /// Publish status changes on the given channel.
    pub fn with_events(mut self, events: StoryEvents) -> Self {
        self.events = Some(events);
        self
    }
}

impl StoryStore for InMemoryStoryStore {
    fn insert(&self, story: Story) -> Result<(), StoreError> {
        let mut stories = self.stories.write()?;
        stories.insert(story.id.clone(), story);
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<Story>, StoreError> {
        let stories = self.stories.read()?;
        Ok(stories.get(id).cloned())
    }

    fn list(&self, filter: &StoryFilter) -> Result<Vec<Story>, StoreError> {
        let stories = self.stories.read()?;
        Ok(stories
            .values()
            .filter(|story| filter.matches(story))
            .cloned()
            .collect())
    }

    fn update_status(&self, id: &str, status: StoryStatus) -> Result<Story, StoreError> {
        let updated = {
            let mut stories = self.stories.write()?;
            let story = stories
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

            self.faults.check("update_status")?;

            story.status = status;
            story.status_changed_at = Utc::now();
            story.clone()
        };

        if let Some(ref events) = self.events {
            events.publish(id, status);
        }

        Ok(updated)
    }
}
