//! Stories: composite work items and their storage.

mod memory;
mod store;
mod types;

pub use memory::InMemoryStoryStore;
pub use store::{StoryFilter, StoryStore};
pub use types::{Story, StoryStatus};
