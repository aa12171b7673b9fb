use std::fmt;
use std::sync::Arc;

use crate::error::MetricsError;
use crate::metrics::StatsdClient;
use crate::statsd::{
    DEFAULT_BUFFER_MAX_POOL_SIZE, DEFAULT_STATSD_HOST, DEFAULT_STATSD_PORT, TransportOptions,
    UdpStatsd,
};
use crate::tags::{TagBuilder, TagSpec, resolve_hostname};

pub const DEFAULT_METRIC_NAME: &str = "job_enqueued";

/// When the interceptor closes the metrics client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ClosePolicy {
    /// Close after every enqueue, for processes that may exit right after.
    #[default]
    PerCall,
    /// Leave the client open for the life of the interceptor.
    ProcessLifetime,
}

/// Options for an [`EnqueueInterceptor`](crate::interceptor::EnqueueInterceptor).
///
/// Unset transport options fall back to `STATSD_HOST`, `STATSD_PORT`,
/// `STATSD_SINGLE_THREAD` and `STATSD_BUFFER_MAX_POOL_SIZE`; an unset hostname
/// falls back to `INSTRUMENTATION_HOSTNAME` and then the system hostname.
#[derive(Clone)]
pub struct InterceptorConfig {
    pub metric_name: String,
    pub tags: Vec<TagSpec>,
    pub skip_tags: Vec<String>,
    pub hostname: Option<String>,
    pub statsd_host: Option<String>,
    pub statsd_port: Option<u16>,
    pub client: Option<Arc<dyn StatsdClient>>,
    pub single_thread: Option<bool>,
    pub buffer_max_pool_size: Option<usize>,
    pub close_policy: ClosePolicy,
}

impl Default for InterceptorConfig {
    fn default() -> Self {
        Self {
            metric_name: DEFAULT_METRIC_NAME.to_string(),
            tags: Vec::new(),
            skip_tags: Vec::new(),
            hostname: None,
            statsd_host: None,
            statsd_port: None,
            client: None,
            single_thread: None,
            buffer_max_pool_size: None,
            close_policy: ClosePolicy::default(),
        }
    }
}

impl fmt::Debug for InterceptorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorConfig")
            .field("metric_name", &self.metric_name)
            .field("tags", &self.tags)
            .field("skip_tags", &self.skip_tags)
            .field("hostname", &self.hostname)
            .field("statsd_host", &self.statsd_host)
            .field("statsd_port", &self.statsd_port)
            .field("client", &self.client.as_ref().map(|_| "<client>"))
            .field("single_thread", &self.single_thread)
            .field("buffer_max_pool_size", &self.buffer_max_pool_size)
            .field("close_policy", &self.close_policy)
            .finish()
    }
}

/// Everything the interceptor needs, with environment fallbacks applied.
pub struct ResolvedConfig {
    pub metric_name: String,
    pub tag_builder: TagBuilder,
    pub client: Arc<dyn StatsdClient>,
    pub close_policy: ClosePolicy,
}

impl InterceptorConfig {
    pub fn with_metric_name(mut self, metric_name: impl Into<String>) -> Self {
        self.metric_name = metric_name.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<TagSpec>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_skip_tag(mut self, key: impl Into<String>) -> Self {
        self.skip_tags.push(key.into());
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn with_statsd(mut self, host: impl Into<String>, port: u16) -> Self {
        self.statsd_host = Some(host.into());
        self.statsd_port = Some(port);
        self
    }

    pub fn with_client(mut self, client: Arc<dyn StatsdClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_single_thread(mut self, single_thread: bool) -> Self {
        self.single_thread = Some(single_thread);
        self
    }

    pub fn with_buffer_max_pool_size(mut self, size: usize) -> Self {
        self.buffer_max_pool_size = Some(size);
        self
    }

    pub fn with_close_policy(mut self, close_policy: ClosePolicy) -> Self {
        self.close_policy = close_policy;
        self
    }

    /// Resolves against the process environment.
    pub fn resolve(self) -> Result<ResolvedConfig, MetricsError> {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    /// Resolves using `env` to look up environment variables.
    pub fn resolve_with<F>(self, env: F) -> Result<ResolvedConfig, MetricsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.metric_name.is_empty() {
            return Err(MetricsError::InvalidConfig(
                "metric_name cannot be empty".to_string(),
            ));
        }

        let hostname = resolve_hostname(self.hostname.as_deref(), &env);
        let tag_builder = TagBuilder::new(self.tags, self.skip_tags, hostname);

        let client = match self.client {
            Some(client) => client,
            None => {
                let host = self
                    .statsd_host
                    .or_else(|| env("STATSD_HOST"))
                    .unwrap_or_else(|| DEFAULT_STATSD_HOST.to_string());
                let port = match self.statsd_port {
                    Some(port) => port,
                    None => parse_env(&env, "STATSD_PORT")?.unwrap_or(DEFAULT_STATSD_PORT),
                };
                let single_thread = match self.single_thread {
                    Some(single_thread) => single_thread,
                    None => parse_bool_env(&env, "STATSD_SINGLE_THREAD")?.unwrap_or(false),
                };
                let buffer_max_pool_size = match self.buffer_max_pool_size {
                    Some(size) => size,
                    None => parse_env(&env, "STATSD_BUFFER_MAX_POOL_SIZE")?
                        .unwrap_or(DEFAULT_BUFFER_MAX_POOL_SIZE),
                };
                let options = TransportOptions {
                    single_thread,
                    buffer_max_pool_size,
                };
                Arc::new(UdpStatsd::new(&host, port, options)?) as Arc<dyn StatsdClient>
            }
        };

        Ok(ResolvedConfig {
            metric_name: self.metric_name,
            tag_builder,
            client,
            close_policy: self.close_policy,
        })
    }
}

fn parse_env<T, F>(env: &F, key: &str) -> Result<Option<T>, MetricsError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match env(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| MetricsError::InvalidConfig(format!("{key}={raw}: {e}"))),
        _ => Ok(None),
    }
}

fn parse_bool_env<F>(env: &F, key: &str) -> Result<Option<bool>, MetricsError>
where
    F: Fn(&str) -> Option<String>,
{
    match env(key).as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some("1") | Some("true") | Some("TRUE") | Some("yes") => Ok(Some(true)),
        Some("0") | Some("false") | Some("FALSE") | Some("no") => Ok(Some(false)),
        Some(raw) => Err(MetricsError::InvalidConfig(format!(
            "{key}={raw}: expected true or false"
        ))),
    }
}
