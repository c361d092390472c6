//! Metrics provider implementations

pub mod replay;
pub mod system;

pub use replay::{ReplayMetrics, ReplayScript, ReplayStep};
pub use system::SystemMetrics;
