use std::future::Future;
use std::pin::Pin;

use crate::dispatch::{DispatchRequest, PublishAck};
use crate::error::Result;

/// Boxed future returned by `Publisher` operations.
pub type PublishFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Contract of the hosted publish/enqueue API.
///
/// The hosted service owns durability, retries and parallelism; this layer
/// only hands it requests. Kept object-safe so managers can share one
/// `Arc<dyn Publisher>` and tests can substitute a recording mock.
pub trait Publisher: Send + Sync {
    /// Submit a message for immediate delivery.
    fn publish_json(&self, request: DispatchRequest) -> PublishFuture<'_, PublishAck>;

    /// Submit a message to a named queue.
    fn enqueue_json(&self, queue: &str, request: DispatchRequest) -> PublishFuture<'_, PublishAck>;

    /// Idempotently create or update a named queue with a parallelism bound.
    fn upsert_queue(&self, name: &str, parallelism: u32) -> PublishFuture<'_, ()>;
}
