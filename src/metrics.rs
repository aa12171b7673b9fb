use crate::error::MetricsError;

/// Minimal StatsD client contract the interceptor talks to.
///
/// Implementations are shared across every enqueue call, so they must be safe
/// to use from several threads at once.
pub trait StatsdClient: Send + Sync + 'static {
    /// Record a counter increment of one for `metric`.
    fn increment(&self, metric: &str, tags: &[String]) -> Result<(), MetricsError>;

    /// Push any buffered samples to the collector.
    fn flush(&self) -> Result<(), MetricsError>;

    /// Release transport resources. Clients without anything to release keep
    /// the default no-op.
    fn close(&self) -> Result<(), MetricsError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct NoopStatsd;

impl StatsdClient for NoopStatsd {
    fn increment(&self, _metric: &str, _tags: &[String]) -> Result<(), MetricsError> {
        Ok(())
    }

    fn flush(&self) -> Result<(), MetricsError> {
        Ok(())
    }
}
