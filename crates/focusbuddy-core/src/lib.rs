pub mod classifier;
pub mod config;
pub mod daemon;
pub mod engine;
pub mod focus;
#[cfg(unix)]
pub mod ipc;
pub mod monitor;
pub mod sink;
pub mod tracker;

#[cfg(test)]
pub(crate) mod test_support;

pub use classifier::CategoryResolver;
pub use daemon::Daemon;
pub use engine::TrackingEngine;
pub use tracker::{SessionTracker, TrackerSnapshot, UsageUpdated};
