//! Test doubles for the hosted publish API.
//!
//! Provides a recording publisher that stands in for the hosted service in
//! unit and integration tests, with assertion helpers for verifying what was
//! dispatched.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use crate::dispatch::{DispatchRequest, PublishAck};
use crate::error::{RelayError, Result};
use crate::publish::{PublishFuture, Publisher};

/// Record of a message handed to the publisher.
#[derive(Debug, Clone)]
pub struct PublishedMessage {
    /// Queue name for `enqueue_json` calls, `None` for `publish_json`.
    pub queue: Option<String>,
    /// The dispatch request as built by the caller.
    pub request: DispatchRequest,
}

/// Record of a queue upsert.
#[derive(Debug, Clone)]
pub struct UpsertedQueue {
    /// Queue name.
    pub name: String,
    /// Parallelism bound.
    pub parallelism: u32,
}

/// Mock publisher for testing.
///
/// Records every call and acknowledges with sequential message ids.
///
/// # Example
///
/// ```ignore
/// let publisher = Arc::new(MockPublisher::new());
/// job.trigger(&payload, DispatchOptions::default()).await?;
///
/// publisher.assert_published_to("https://x/api/q?job=send-email");
/// ```
#[derive(Default)]
pub struct MockPublisher {
    messages: RwLock<Vec<PublishedMessage>>,
    queues: RwLock<Vec<UpsertedQueue>>,
    fail_with: RwLock<Option<(u16, String)>>,
    counter: AtomicU64,
}

impl MockPublisher {
    /// Create a new mock publisher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call fail as if the hosted service rejected it.
    pub fn fail_next_with(&self, status: u16, message: impl Into<String>) {
        *self.fail_with.write().unwrap() = Some((status, message.into()));
    }

    /// Get all recorded messages.
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.messages.read().unwrap().clone()
    }

    /// Get all recorded queue upserts.
    pub fn upserted_queues(&self) -> Vec<UpsertedQueue> {
        self.queues.read().unwrap().clone()
    }

    /// Assert that a message was published to the exact URL.
    pub fn assert_published_to(&self, url: &str) {
        let messages = self.messages.read().unwrap();
        let found = messages.iter().any(|m| m.request.url == url);
        assert!(
            found,
            "Expected a message published to '{}', got: {:?}",
            url,
            messages.iter().map(|m| &m.request.url).collect::<Vec<_>>()
        );
    }

    /// Assert that a message was published with matching request fields.
    pub fn assert_published_with<F>(&self, predicate: F)
    where
        F: Fn(&PublishedMessage) -> bool,
    {
        let messages = self.messages.read().unwrap();
        assert!(
            messages.iter().any(|m| predicate(m)),
            "No published message matched the predicate"
        );
    }

    /// Assert the total number of published messages.
    pub fn assert_publish_count(&self, expected: usize) {
        let count = self.messages.read().unwrap().len();
        assert_eq!(
            count, expected,
            "Expected {} published messages, got {}",
            expected, count
        );
    }

    /// Assert that a queue was upserted by name.
    pub fn assert_queue_upserted(&self, name: &str) {
        let queues = self.queues.read().unwrap();
        assert!(
            queues.iter().any(|q| q.name == name),
            "Expected queue '{}' to be upserted, got: {:?}",
            name,
            queues.iter().map(|q| &q.name).collect::<Vec<_>>()
        );
    }

    fn take_failure(&self) -> Option<RelayError> {
        self.fail_with
            .write()
            .unwrap()
            .take()
            .map(|(status, message)| RelayError::Publish { status, message })
    }

    fn ack(&self) -> Result<PublishAck> {
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PublishAck {
            message_id: format!("msg_{}", n),
            deduplicated: false,
        })
    }
}

impl Publisher for MockPublisher {
    fn publish_json(&self, request: DispatchRequest) -> PublishFuture<'_, PublishAck> {
        Box::pin(async move {
            let ack = self.ack()?;
            self.messages
                .write()
                .unwrap()
                .push(PublishedMessage {
                    queue: None,
                    request,
                });
            Ok(ack)
        })
    }

    fn enqueue_json(&self, queue: &str, request: DispatchRequest) -> PublishFuture<'_, PublishAck> {
        let queue = queue.to_string();
        Box::pin(async move {
            let ack = self.ack()?;
            self.messages.write().unwrap().push(PublishedMessage {
                queue: Some(queue),
                request,
            });
            Ok(ack)
        })
    }

    fn upsert_queue(&self, name: &str, parallelism: u32) -> PublishFuture<'_, ()> {
        let name = name.to_string();
        Box::pin(async move {
            if let Some(err) = self.take_failure() {
                return Err(err);
            }
            self.queues
                .write()
                .unwrap()
                .push(UpsertedQueue { name, parallelism });
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::DispatchOptions;

    fn request(url_key: &str) -> DispatchRequest {
        DispatchRequest::new(
            "https://x/api/q",
            url_key,
            serde_json::json!({}),
            DispatchOptions::default(),
        )
    }

    #[tokio::test]
    async fn test_records_published_messages() {
        let publisher = MockPublisher::new();
        let ack = publisher.publish_json(request("a")).await.unwrap();
        assert_eq!(ack.message_id, "msg_1");

        publisher.assert_publish_count(1);
        publisher.assert_published_to("https://x/api/q?job=a");
    }

    #[tokio::test]
    async fn test_injected_failure_surfaces_once() {
        let publisher = MockPublisher::new();
        publisher.fail_next_with(429, "quota exceeded");

        let err = publisher.publish_json(request("a")).await.unwrap_err();
        assert!(matches!(err, RelayError::Publish { status: 429, .. }));

        publisher.publish_json(request("a")).await.unwrap();
        publisher.assert_publish_count(1);
    }
}
