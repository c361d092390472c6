//! Metrics source trait

use crate::Result;
use crate::types::MetricsSnapshot;

/// Source of host metrics for the status engine.
///
/// Calls may be slow (they typically query the kernel or shell out) and may
/// fail. The status engine treats both as normal: it calls the provider off the
/// render path and keeps the last good snapshot on error.
#[async_trait::async_trait]
pub trait MetricsProvider: Send + 'static {
    /// Collect a fresh snapshot.
    async fn get_metrics(&mut self) -> Result<MetricsSnapshot>;
}

#[async_trait::async_trait]
impl<P: MetricsProvider + ?Sized> MetricsProvider for Box<P> {
    async fn get_metrics(&mut self) -> Result<MetricsSnapshot> {
        (**self).get_metrics().await
    }
}
