use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::TagError;
use crate::job::JobDescriptor;

/// Tag key that is never emitted at enqueue time.
pub const STATUS_TAG: &str = "status";

/// Request the enqueue happened in, when there is one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestEnv {
    pub method: String,
    pub path: String,
    pub headers: BTreeMap<String, String>,
}

impl RequestEnv {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            headers: BTreeMap::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// A tag computed per enqueue.
///
/// Returns the full `key:value` tag, or `None` when there is nothing to emit.
pub trait DynamicTag: Send + Sync {
    fn evaluate(
        &self,
        job: &JobDescriptor,
        queue: &str,
        env: Option<&RequestEnv>,
    ) -> Result<Option<String>, TagError>;
}

impl<F> DynamicTag for F
where
    F: Fn(&JobDescriptor, &str, Option<&RequestEnv>) -> Result<Option<String>, TagError>
        + Send
        + Sync,
{
    fn evaluate(
        &self,
        job: &JobDescriptor,
        queue: &str,
        env: Option<&RequestEnv>,
    ) -> Result<Option<String>, TagError> {
        self(job, queue, env)
    }
}

#[derive(Clone)]
pub enum TagSpec {
    Static(String),
    Dynamic(Arc<dyn DynamicTag>),
}

impl TagSpec {
    pub fn fixed(tag: impl Into<String>) -> Self {
        TagSpec::Static(tag.into())
    }

    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(&JobDescriptor, &str, Option<&RequestEnv>) -> Result<Option<String>, TagError>
            + Send
            + Sync
            + 'static,
    {
        TagSpec::Dynamic(Arc::new(f))
    }

    pub fn from_evaluator(evaluator: Arc<dyn DynamicTag>) -> Self {
        TagSpec::Dynamic(evaluator)
    }
}

impl fmt::Debug for TagSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagSpec::Static(tag) => f.debug_tuple("Static").field(tag).finish(),
            TagSpec::Dynamic(_) => f.debug_tuple("Dynamic").field(&"<function>").finish(),
        }
    }
}

impl From<&str> for TagSpec {
    fn from(tag: &str) -> Self {
        TagSpec::Static(tag.to_string())
    }
}

impl From<String> for TagSpec {
    fn from(tag: String) -> Self {
        TagSpec::Static(tag)
    }
}

/// Key portion of a `key:value` tag.
pub fn tag_key(tag: &str) -> &str {
    tag.split_once(':').map_or(tag, |(key, _)| key)
}

/// Ordered tags attached to one metric sample.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet(Vec<String>);

impl TagSet {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.0.iter().any(|t| tag_key(t) == key)
    }
}

impl<'a> IntoIterator for &'a TagSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Assembles the tags for an enqueue event.
#[derive(Debug, Clone)]
pub struct TagBuilder {
    specs: Vec<TagSpec>,
    skip_tags: BTreeSet<String>,
    hostname: String,
}

impl TagBuilder {
    /// `status` is always added to `skip_tags`.
    pub fn new<I, S>(specs: Vec<TagSpec>, skip_tags: I, hostname: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut skip_tags: BTreeSet<String> = skip_tags.into_iter().map(Into::into).collect();
        skip_tags.insert(STATUS_TAG.to_string());
        Self {
            specs,
            skip_tags,
            hostname: hostname.into(),
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn skip_tags(&self) -> &BTreeSet<String> {
        &self.skip_tags
    }

    pub fn build(&self, job: &JobDescriptor, queue: &str) -> TagSet {
        self.build_with_env(job, queue, None)
    }

    pub fn build_with_env(
        &self,
        job: &JobDescriptor,
        queue: &str,
        env: Option<&RequestEnv>,
    ) -> TagSet {
        let mut tags = Vec::with_capacity(4 + self.specs.len());

        tags.push(format!("worker:{}", job.worker_class()));
        if job.job_class() != job.worker_class() {
            tags.push(format!("job_class:{}", job.job_class()));
        }
        tags.push(format!("queue:{queue}"));
        tags.push(format!("hostname:{}", self.hostname));

        tags.extend(self.specs.iter().filter_map(|spec| match spec {
            TagSpec::Static(tag) => Some(tag.clone()),
            TagSpec::Dynamic(_) => None,
        }));

        tags.extend(self.specs.iter().filter_map(|spec| match spec {
            TagSpec::Static(_) => None,
            TagSpec::Dynamic(evaluator) => evaluate(evaluator.as_ref(), job, queue, env),
        }));

        tags.retain(|tag| !self.skip_tags.contains(tag_key(tag)));
        TagSet(tags)
    }
}

fn evaluate(
    evaluator: &dyn DynamicTag,
    job: &JobDescriptor,
    queue: &str,
    env: Option<&RequestEnv>,
) -> Option<String> {
    match panic::catch_unwind(AssertUnwindSafe(|| evaluator.evaluate(job, queue, env))) {
        Ok(Ok(Some(tag))) if !tag.trim().is_empty() => Some(tag),
        Ok(Ok(_)) => None,
        Ok(Err(e)) => {
            log::warn!("Skipping dynamic tag for {}: {e}", job.worker_class());
            None
        }
        Err(_) => {
            log::warn!("Skipping dynamic tag for {}: tag function panicked", job.worker_class());
            None
        }
    }
}

/// Picks the hostname tag value: explicit option, then
/// `INSTRUMENTATION_HOSTNAME`, then the system hostname.
pub fn resolve_hostname<F>(explicit: Option<&str>, env: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(hostname) = explicit {
        return hostname.to_string();
    }
    if let Some(hostname) = env("INSTRUMENTATION_HOSTNAME").filter(|h| !h.is_empty()) {
        return hostname;
    }
    match hostname::get() {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(e) => {
            log::warn!("Could not look up system hostname: {e}");
            "unknown".to_string()
        }
    }
}
