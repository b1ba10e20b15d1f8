//! Asset processing records and their storage.

mod memory;
mod store;
mod types;

pub use memory::InMemoryAssetStore;
pub use store::AssetStore;
pub use types::{AssetRecord, StallPolicy};
