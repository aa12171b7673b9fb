use std::future::Future;
use std::sync::Arc;

use crate::config::{ClosePolicy, InterceptorConfig, ResolvedConfig};
use crate::error::MetricsError;
use crate::job::JobDescriptor;
use crate::metrics::StatsdClient;
use crate::tags::{RequestEnv, TagBuilder};

/// Closes the client when dropped, on every exit path of an intercept call.
struct CloseGuard<'a> {
    client: &'a dyn StatsdClient,
    policy: ClosePolicy,
}

impl Drop for CloseGuard<'_> {
    fn drop(&mut self) {
        if self.policy == ClosePolicy::PerCall {
            if let Err(e) = self.client.close() {
                log::warn!("Failed to close metrics client: {e}");
            }
        }
    }
}

/// Client-side middleware counting every job pushed onto a queue.
///
/// Install it in front of the code that performs the actual push; it should
/// run last among middleware that may veto an enqueue, so that stopped jobs
/// are not counted.
pub struct EnqueueInterceptor {
    metric_name: String,
    tag_builder: TagBuilder,
    client: Arc<dyn StatsdClient>,
    close_policy: ClosePolicy,
}

impl EnqueueInterceptor {
    /// Builds an interceptor, reading unset options from the process environment.
    pub fn new(config: InterceptorConfig) -> Result<Self, MetricsError> {
        Ok(Self::from_resolved(config.resolve()?))
    }

    pub fn from_resolved(resolved: ResolvedConfig) -> Self {
        log::debug!(
            "Enqueue instrumentation emitting {} (close policy: {:?})",
            resolved.metric_name,
            resolved.close_policy
        );
        Self {
            metric_name: resolved.metric_name,
            tag_builder: resolved.tag_builder,
            client: resolved.client,
            close_policy: resolved.close_policy,
        }
    }

    pub fn metric_name(&self) -> &str {
        &self.metric_name
    }

    pub fn tag_builder(&self) -> &TagBuilder {
        &self.tag_builder
    }

    pub fn close_policy(&self) -> ClosePolicy {
        self.close_policy
    }

    /// Counts the enqueue of `job` on `queue`, then awaits `next`.
    ///
    /// Errors from `increment` or `flush` are returned before `next` runs.
    /// Whatever `next` yields is returned unchanged.
    pub async fn intercept<F, T, E>(&self, job: &JobDescriptor, queue: &str, next: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<MetricsError>,
    {
        self.intercept_with_env(job, queue, None, next).await
    }

    pub async fn intercept_with_env<F, T, E>(
        &self,
        job: &JobDescriptor,
        queue: &str,
        env: Option<&RequestEnv>,
        next: F,
    ) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<MetricsError>,
    {
        let _guard = self.guard();
        self.record(job, queue, env)?;
        next.await
    }

    /// Synchronous counterpart of [`intercept`](Self::intercept).
    pub fn intercept_blocking<F, T, E>(&self, job: &JobDescriptor, queue: &str, next: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<MetricsError>,
    {
        self.intercept_blocking_with_env(job, queue, None, next)
    }

    pub fn intercept_blocking_with_env<F, T, E>(
        &self,
        job: &JobDescriptor,
        queue: &str,
        env: Option<&RequestEnv>,
        next: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<MetricsError>,
    {
        let _guard = self.guard();
        self.record(job, queue, env)?;
        next()
    }

    fn guard(&self) -> CloseGuard<'_> {
        CloseGuard {
            client: self.client.as_ref(),
            policy: self.close_policy,
        }
    }

    fn record(
        &self,
        job: &JobDescriptor,
        queue: &str,
        env: Option<&RequestEnv>,
    ) -> Result<(), MetricsError> {
        let tags = self.tag_builder.build_with_env(job, queue, env);
        log::debug!("Recording {} for job {}", self.metric_name, job.jid());

        self.client.increment(&self.metric_name, tags.as_slice())?;
        // Short-lived processes can exit before a background flush would fire.
        self.client.flush()
    }
}
