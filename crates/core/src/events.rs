//! Story change notifications.
//!
//! Every successful status update publishes a [`StoryChanged`] event.
//! Transport layers subscribe and push fresh snapshots to their clients.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::story::StoryStatus;

/// A story's status changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryChanged {
    pub story_id: String,
    pub status: StoryStatus,
}

/// Broadcast channel for story change notifications.
///
/// Cheaply cloneable; each subscriber receives every event published after
/// it subscribed.
#[derive(Debug, Clone)]
pub struct StoryEvents {
    sender: broadcast::Sender<StoryChanged>,
}

impl StoryEvents {
    /// Create a channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a change. Having no subscribers is fine.
    pub fn publish(&self, story_id: &str, status: StoryStatus) {
        let _ = self.sender.send(StoryChanged {
            story_id: story_id.to_string(),
            status,
        });
    }

    /// Subscribe to future changes.
    pub fn subscribe(&self) -> broadcast::Receiver<StoryChanged> {
        self.sender.subscribe()
    }
}

impl Default for StoryEvents {
    fn default() -> Self {
        Self::new(256)
    }
}
