//! Harvest passes and the queue that triggers them.

pub mod dispatcher;
pub mod harvest;

pub use dispatcher::{DispatcherStats, PassDispatcher, PassRequest};
pub use harvest::{HarvestConfig, HarvestWorker, PassEnd, PassSummary};
