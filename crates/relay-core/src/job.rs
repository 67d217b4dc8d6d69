use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{RelayError, Result};

/// Type alias for boxed job handler function.
pub type BoxedJobHandler =
    Arc<dyn Fn(Value) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> + Send + Sync>;

/// A named background job: a unique key and the handler invoked when the
/// hosted service delivers the job back to this process.
#[derive(Clone)]
pub struct Job {
    key: String,
    handler: BoxedJobHandler,
}

impl Job {
    /// Create a job from a typed async handler.
    ///
    /// The payload is deserialized at the boundary; a payload that does not
    /// match `T` fails the handler with a validation error.
    pub fn new<T, F, Fut>(key: impl Into<String>, handler: F) -> Self
    where
        T: DeserializeOwned + Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let boxed: BoxedJobHandler = Arc::new(move |payload| {
            let handler = handler.clone();
            Box::pin(async move {
                let parsed: T = serde_json::from_value(payload)
                    .map_err(|e| RelayError::Validation(e.to_string()))?;
                handler(parsed).await
            })
        });

        Self {
            key: key.into(),
            handler: boxed,
        }
    }

    /// Create a job from an already type-erased handler.
    pub fn from_parts(key: impl Into<String>, handler: BoxedJobHandler) -> Self {
        Self {
            key: key.into(),
            handler,
        }
    }

    /// The job key, used to identify the job.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The type-erased handler.
    pub fn handler(&self) -> BoxedJobHandler {
        self.handler.clone()
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job").field("key", &self.key).finish()
    }
}

/// Registry of all jobs known to the webhook entry point.
///
/// Built once from a job list and read-only afterwards; keys are unique and
/// lookups fail explicitly rather than silently no-op.
#[derive(Clone, Default)]
pub struct JobRegistry {
    jobs: HashMap<String, BoxedJobHandler>,
}

impl JobRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            jobs: HashMap::new(),
        }
    }

    /// Build a registry from a list of jobs.
    pub fn from_jobs(jobs: Vec<Job>) -> Result<Self> {
        let mut registry = Self::new();
        for job in jobs {
            registry.register(job)?;
        }
        Ok(registry)
    }

    /// Register a job. Duplicate keys are an error, never an overwrite.
    pub fn register(&mut self, job: Job) -> Result<()> {
        if self.jobs.contains_key(job.key()) {
            return Err(RelayError::DuplicateJob(job.key().to_string()));
        }
        self.jobs.insert(job.key.clone(), job.handler);
        Ok(())
    }

    /// Get a handler by job key.
    pub fn get(&self, key: &str) -> Option<BoxedJobHandler> {
        self.jobs.get(key).cloned()
    }

    /// Check if a job exists.
    pub fn exists(&self, key: &str) -> bool {
        self.jobs.contains_key(key)
    }

    /// Invoke the handler registered under `key` with `payload`.
    pub async fn run(&self, key: &str, payload: Value) -> Result<()> {
        let handler = self
            .get(key)
            .ok_or_else(|| RelayError::JobNotFound(key.to_string()))?;
        handler(payload).await
    }

    /// Get all job keys.
    pub fn job_keys(&self) -> impl Iterator<Item = &str> {
        self.jobs.keys().map(|s| s.as_str())
    }

    /// Get the number of registered jobs.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl std::fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRegistry")
            .field("jobs", &self.jobs.keys().collect::<Vec<_>>())
            .finish()
    }
}
