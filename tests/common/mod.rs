#![allow(dead_code)]

use async_trait::async_trait;
use enqueue_metrics::{
    EnqueueInterceptor, InterceptorConfig, Job, StatsdClient,
    error::{MetricsError, QueueError},
    queue::Queue,
};
use std::sync::{Arc, Mutex, Once};
use tracing_subscriber::{EnvFilter, fmt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Initializes logging for integration tests with a consistent configuration.
/// This function is safe to call multiple times as it will only initialize logging once.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("enqueue_metrics=debug,test=debug"));

        let json_layer = fmt::layer()
            .json()
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_target(true);

        use tracing_subscriber::layer::SubscriberExt;
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(json_layer)
            .try_init();
    });
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientCall {
    Increment { metric: String, tags: Vec<String> },
    Flush,
    Close,
}

/// Statsd client that records every call instead of sending it.
#[derive(Debug, Clone, Default)]
pub struct FakeStatsd {
    calls: Arc<Mutex<Vec<ClientCall>>>,
    fail_increment: bool,
    fail_close: bool,
}

impl FakeStatsd {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_increment() -> Self {
        Self {
            fail_increment: true,
            ..Self::default()
        }
    }

    pub fn failing_close() -> Self {
        Self {
            fail_close: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<ClientCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &ClientCall) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    pub fn increments(&self) -> Vec<(String, Vec<String>)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ClientCall::Increment { metric, tags } => Some((metric, tags)),
                _ => None,
            })
            .collect()
    }
}

impl StatsdClient for FakeStatsd {
    fn increment(&self, metric: &str, tags: &[String]) -> Result<(), MetricsError> {
        if self.fail_increment {
            return Err(MetricsError::AddressResolution("statsd.invalid:8125".into()));
        }
        self.calls.lock().unwrap().push(ClientCall::Increment {
            metric: metric.to_string(),
            tags: tags.to_vec(),
        });
        Ok(())
    }

    fn flush(&self) -> Result<(), MetricsError> {
        self.calls.lock().unwrap().push(ClientCall::Flush);
        Ok(())
    }

    fn close(&self) -> Result<(), MetricsError> {
        self.calls.lock().unwrap().push(ClientCall::Close);
        if self.fail_close {
            return Err(MetricsError::Io(std::io::Error::other("socket already shut down")));
        }
        Ok(())
    }
}

pub fn interceptor_with(client: &FakeStatsd, config: InterceptorConfig) -> EnqueueInterceptor {
    let resolved = config
        .with_client(Arc::new(client.clone()))
        .resolve_with(|_| None)
        .expect("config should resolve");
    EnqueueInterceptor::from_resolved(resolved)
}

#[derive(Debug, Clone)]
pub struct TestJob {
    pub worker: String,
    pub wrapped: Option<String>,
}

impl TestJob {
    pub fn new(worker: &str) -> Self {
        Self {
            worker: worker.to_string(),
            wrapped: None,
        }
    }

    pub fn wrapping(mut self, class: &str) -> Self {
        self.wrapped = Some(class.to_string());
        self
    }
}

impl Job for TestJob {
    fn job_type(&self) -> &str {
        &self.worker
    }

    fn job_class(&self) -> Option<&str> {
        self.wrapped.as_deref()
    }
}

#[derive(Clone)]
pub struct TestQueue {
    pub name: String,
    pub jobs: Arc<tokio::sync::Mutex<Vec<TestJob>>>,
    pub reject_pushes: bool,
}

impl TestQueue {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            jobs: Arc::new(tokio::sync::Mutex::new(Vec::new())),
            reject_pushes: false,
        }
    }

    pub fn rejecting(mut self) -> Self {
        self.reject_pushes = true;
        self
    }
}

#[async_trait]
impl Queue for TestQueue {
    type JobType = TestJob;

    fn queue_name(&self) -> &str {
        &self.name
    }

    async fn push(&self, job: Self::JobType) -> Result<(), QueueError> {
        if self.reject_pushes {
            return Err(QueueError::QueueNotFound(self.name.clone()));
        }
        self.jobs.lock().await.push(job);
        Ok(())
    }

    async fn pop(&self) -> Result<Self::JobType, QueueError> {
        self.jobs
            .lock()
            .await
            .pop()
            .ok_or_else(|| QueueError::JobNotFound("No jobs available".into()))
    }
}
