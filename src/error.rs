use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Statsd transport error: {0}")]
    Transport(#[from] cadence::MetricError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Could not resolve statsd address: {0}")]
    AddressResolution(String),
}

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Metrics error: {0}")]
    MetricsError(#[from] MetricsError),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Queue not found: {0}")]
    QueueNotFound(String),
}

/// Error returned by user supplied tag functions.
pub type TagError = Box<dyn std::error::Error + Send + Sync>;
