//! Asset workers: consume dispatched jobs and report progress back.

mod config;
mod http_reporter;
mod pool;
mod processor;
mod reporter;

pub use config::WorkerConfig;
pub use http_reporter::HttpAssetReporter;
pub use pool::{PoolStatus, WorkerPool};
pub use processor::{AssetProcessor, JobOutcome};
pub use reporter::{Acknowledgement, AssetReporter, ReportError};
