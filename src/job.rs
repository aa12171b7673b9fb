use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Anything that can be pushed onto a [`Queue`](crate::queue::Queue).
pub trait Job: Send + Sync {
    /// Name of the worker that will run this job.
    fn job_type(&self) -> &str;

    /// Class of the wrapped job when the worker is a generic adapter.
    fn job_class(&self) -> Option<&str> {
        None
    }

    fn args(&self) -> Vec<serde_json::Value> {
        Vec::new()
    }
}

/// Snapshot of a job at the moment it is enqueued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptor {
    worker_class: String,
    job_class: String,
    jid: String,
    queue: String,
    args: Vec<serde_json::Value>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl JobDescriptor {
    pub fn new(worker_class: impl Into<String>, queue: impl Into<String>) -> Self {
        let worker_class = worker_class.into();
        Self {
            job_class: worker_class.clone(),
            worker_class,
            jid: Uuid::new_v4().simple().to_string(),
            queue: queue.into(),
            args: Vec::new(),
            created_at: chrono::Utc::now(),
        }
    }

    /// Builds the descriptor for `job` about to be pushed onto `queue`.
    pub fn from_job<J: Job + ?Sized>(job: &J, queue: &str) -> Self {
        let mut descriptor = Self::new(job.job_type(), queue).with_args(job.args());
        if let Some(class) = job.job_class() {
            descriptor = descriptor.with_job_class(class);
        }
        descriptor
    }

    pub fn with_job_class(mut self, job_class: impl Into<String>) -> Self {
        self.job_class = job_class.into();
        self
    }

    pub fn with_jid(mut self, jid: impl Into<String>) -> Self {
        self.jid = jid.into();
        self
    }

    pub fn with_args(mut self, args: Vec<serde_json::Value>) -> Self {
        self.args = args;
        self
    }

    pub fn worker_class(&self) -> &str {
        &self.worker_class
    }

    pub fn job_class(&self) -> &str {
        &self.job_class
    }

    pub fn jid(&self) -> &str {
        &self.jid
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub fn args(&self) -> &[serde_json::Value] {
        &self.args
    }

    pub fn created_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.created_at
    }
}
