use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;

use relay_core::config::{RelayConfig, RetryPolicy};
use relay_core::dispatch::{DispatchOptions, DispatchRequest, PublishAck};
use relay_core::error::{RelayError, Result};
use relay_core::job::Job;
use relay_core::publish::Publisher;

use crate::client::HttpPublisher;

/// Type alias for the stored typed handler of a job handle.
type TypedHandler<T> =
    Arc<dyn Fn(T) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> + Send + Sync>;

/// A named queue handle recorded after provisioning.
#[derive(Debug, Clone)]
pub struct Queue {
    /// Queue name.
    pub name: String,
    /// Parallelism bound enforced by the hosted service.
    pub parallelism: u32,
}

/// Options for provisioning a queue.
#[derive(Debug, Clone)]
pub struct QueueOptions {
    /// Maximum concurrent deliveries the hosted service performs.
    pub parallelism: u32,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self { parallelism: 1 }
    }
}

impl QueueOptions {
    /// Set the parallelism bound.
    pub fn with_parallelism(parallelism: u32) -> Self {
        Self { parallelism }
    }
}

/// Configuration holder and factory for jobs bound to the hosted publish API.
///
/// Queue handles created through `create_queue` are recorded here; a
/// `queue()` dispatch to a name that was never created fails explicitly.
#[derive(Clone)]
pub struct JobManager {
    publisher: Arc<dyn Publisher>,
    endpoint: String,
    retry: Option<RetryPolicy>,
    configured_queues: Vec<String>,
    queues: Arc<RwLock<HashMap<String, Queue>>>,
}

impl JobManager {
    /// Create a manager from raw credentials, constructing its own publisher.
    ///
    /// Fails when the credential is malformed (delegated to the publisher
    /// constructor).
    pub fn new(config: RelayConfig) -> Result<Self> {
        let publisher = HttpPublisher::new(config.token.clone(), config.api_base.clone())?;
        Ok(Self::with_publisher(Arc::new(publisher), config))
    }

    /// Create a manager around a pre-built publisher.
    pub fn with_publisher(publisher: Arc<dyn Publisher>, config: RelayConfig) -> Self {
        Self {
            publisher,
            endpoint: config.endpoint,
            retry: config.retry,
            configured_queues: config.queues,
            queues: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// The callback endpoint dispatched jobs are delivered back to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Upsert every queue named in the configuration, parallelism 1.
    pub async fn provision(&self) -> Result<()> {
        for name in self.configured_queues.clone() {
            self.create_queue(&name, QueueOptions::default()).await?;
        }
        Ok(())
    }

    /// Idempotently create or update a named queue and record its handle.
    ///
    /// Must be called before any `queue()` dispatch to that name.
    pub async fn create_queue(&self, name: &str, options: QueueOptions) -> Result<Queue> {
        self.publisher
            .upsert_queue(name, options.parallelism)
            .await?;

        let queue = Queue {
            name: name.to_string(),
            parallelism: options.parallelism,
        };
        self.queues
            .write()
            .await
            .insert(queue.name.clone(), queue.clone());

        tracing::debug!(queue = %queue.name, parallelism = queue.parallelism, "queue provisioned");
        Ok(queue)
    }

    /// Create a job bound to this manager's publisher and endpoint.
    pub fn create_job<T, F, Fut>(&self, key: impl Into<String>, handler: F) -> JobHandle<T>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let handler: TypedHandler<T> = Arc::new(move |payload| Box::pin(handler(payload)));

        JobHandle {
            key: key.into(),
            handler,
            publisher: self.publisher.clone(),
            endpoint: self.endpoint.clone(),
            retry: self.retry.clone(),
            queues: self.queues.clone(),
        }
    }
}

/// A registered job: run it locally, trigger it immediately, or enqueue it
/// on a named queue.
pub struct JobHandle<T> {
    key: String,
    handler: TypedHandler<T>,
    publisher: Arc<dyn Publisher>,
    endpoint: String,
    retry: Option<RetryPolicy>,
    queues: Arc<RwLock<HashMap<String, Queue>>>,
}

impl<T> Clone for JobHandle<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            handler: self.handler.clone(),
            publisher: self.publisher.clone(),
            endpoint: self.endpoint.clone(),
            retry: self.retry.clone(),
            queues: self.queues.clone(),
        }
    }
}

impl<T> std::fmt::Debug for JobHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobHandle").field("key", &self.key).finish()
    }
}

impl<T> JobHandle<T>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    /// The job key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Invoke the handler directly, in-process, bypassing the hosted service.
    ///
    /// Returns the handler's result unchanged; no timeout or cancellation of
    /// its own.
    pub async fn run(&self, payload: T) -> Result<()> {
        (self.handler)(payload).await
    }

    /// Submit the job to the hosted publish API for immediate delivery.
    pub async fn trigger(&self, payload: &T, options: DispatchOptions) -> Result<PublishAck> {
        let request = self.build_request(payload, options)?;
        self.publisher.publish_json(request).await
    }

    /// Submit the job to a previously created named queue.
    ///
    /// The target is `options.queue`, defaulting to `"default"`; a queue that
    /// was never created via `create_queue` is an error.
    pub async fn queue(&self, payload: &T, options: DispatchOptions) -> Result<PublishAck> {
        let name = options.queue_name().to_string();
        if !self.queues.read().await.contains_key(&name) {
            return Err(RelayError::QueueNotFound(name));
        }

        let request = self.build_request(payload, options)?;
        self.publisher.enqueue_json(&name, request).await
    }

    /// Type-erased form for handing to the webhook entry point.
    pub fn as_job(&self) -> Job {
        let handler = self.handler.clone();
        Job::new(self.key.clone(), move |payload: T| (handler)(payload))
    }

    fn build_request(&self, payload: &T, mut options: DispatchOptions) -> Result<DispatchRequest> {
        // Manager-level retry policy applies unless the call overrides it.
        if options.retries.is_none() {
            if let Some(retry) = &self.retry {
                options.retries = Some(retry.retries);
                options.backoff = Some(retry.backoff);
            }
        }

        let body = serde_json::to_value(payload)?;
        Ok(DispatchRequest::new(&self.endpoint, &self.key, body, options))
    }
}
