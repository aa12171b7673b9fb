pub mod config;
pub mod error;
pub mod interceptor;
pub mod job;
pub mod metrics;
pub mod queue;
pub mod statsd;
pub mod tags;

pub use config::{ClosePolicy, InterceptorConfig};
pub use interceptor::EnqueueInterceptor;
pub use job::{Job, JobDescriptor};
pub use metrics::{NoopStatsd, StatsdClient};
pub use tags::{RequestEnv, TagBuilder, TagSet, TagSpec};
