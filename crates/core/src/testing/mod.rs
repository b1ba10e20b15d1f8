//! Testing utilities shared by unit and integration tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use storyline_core::testing::{fixtures, RecordingWorkQueue};
//!
//! let stories = fixtures::story_store(&[("story-1", &["asset-1", "asset-2"])]);
//! let queue = RecordingWorkQueue::new();
//! ```

mod recording_queue;

pub use recording_queue::RecordingWorkQueue;

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::{Duration, Utc};

    use crate::asset::AssetRecord;
    use crate::story::{InMemoryStoryStore, Story, StoryStore};

    /// Create an idle story titled after its id.
    pub fn story(id: &str, assets: &[&str]) -> Story {
        Story::new(id, id, assets.iter().map(|a| a.to_string()).collect())
    }

    /// An in-memory story store holding the given `(id, assets)` stories.
    pub fn story_store(stories: &[(&str, &[&str])]) -> InMemoryStoryStore {
        let store = InMemoryStoryStore::new();
        seed(&store, stories);
        store
    }

    /// Insert `(id, assets)` stories into any store.
    pub fn seed(store: &dyn StoryStore, stories: &[(&str, &[&str])]) {
        for (id, assets) in stories {
            store
                .insert(story(id, assets))
                .expect("seeding a story store should not fail");
        }
    }

    /// A started record whose last heartbeat was `seconds_ago`.
    pub fn record_with_heartbeat(id: &str, seconds_ago: i64) -> AssetRecord {
        let mut record = AssetRecord::new(id);
        record.started = true;
        record.last_heartbeat_at = Utc::now() - Duration::seconds(seconds_ago);
        record
    }

    /// A record never started, created `seconds_ago`.
    pub fn unstarted_record(id: &str, seconds_ago: i64) -> AssetRecord {
        let mut record = AssetRecord::new(id);
        record.created_at = Utc::now() - Duration::seconds(seconds_ago);
        record.last_heartbeat_at = record.created_at;
        record
    }
}
