use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::QueueError,
    interceptor::EnqueueInterceptor,
    job::{Job, JobDescriptor},
};

#[async_trait]
pub trait Queue: Send + Sync {
    type JobType: Job;

    fn queue_name(&self) -> &str;

    async fn push(&self, job: Self::JobType) -> Result<(), QueueError>;

    async fn pop(&self) -> Result<Self::JobType, QueueError>;
}

/// Wraps a queue so that every push is counted by an [`EnqueueInterceptor`].
pub struct InstrumentedQueue<Q> {
    inner: Q,
    interceptor: Arc<EnqueueInterceptor>,
}

impl<Q: Queue> InstrumentedQueue<Q> {
    pub fn new(inner: Q, interceptor: Arc<EnqueueInterceptor>) -> Self {
        Self { inner, interceptor }
    }

    pub fn inner(&self) -> &Q {
        &self.inner
    }

    pub fn into_inner(self) -> Q {
        self.inner
    }
}

impl<Q: Clone> Clone for InstrumentedQueue<Q> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            interceptor: self.interceptor.clone(),
        }
    }
}

#[async_trait]
impl<Q> Queue for InstrumentedQueue<Q>
where
    Q: Queue,
    Q::JobType: Send + 'static,
{
    type JobType = Q::JobType;

    fn queue_name(&self) -> &str {
        self.inner.queue_name()
    }

    async fn push(&self, job: Self::JobType) -> Result<(), QueueError> {
        let queue = self.inner.queue_name();
        let descriptor = JobDescriptor::from_job(&job, queue);
        self.interceptor
            .intercept(&descriptor, queue, self.inner.push(job))
            .await
    }

    async fn pop(&self) -> Result<Self::JobType, QueueError> {
        self.inner.pop().await
    }
}
