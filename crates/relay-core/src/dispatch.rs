use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Backoff;

/// Name of the queue used when a dispatch does not pick one.
pub const DEFAULT_QUEUE: &str = "default";

/// Delivery options passed through verbatim to the hosted service.
///
/// Everything here is advisory to the hosted service; nothing in this layer
/// acts on it.
#[derive(Debug, Clone, Default)]
pub struct DispatchOptions {
    /// Delay before the first delivery attempt.
    pub delay: Option<Duration>,

    /// Absolute earliest delivery time.
    pub not_before: Option<DateTime<Utc>>,

    /// Explicit deduplication id.
    pub deduplication_id: Option<String>,

    /// Let the hosted service deduplicate on the message content.
    pub content_based_deduplication: bool,

    /// Per-dispatch retry override. Defaults to the manager-level policy.
    pub retries: Option<u32>,

    /// Backoff strategy override accompanying `retries`.
    pub backoff: Option<Backoff>,

    /// Target queue for `queue()` dispatches. Defaults to `"default"`.
    pub queue: Option<String>,
}

impl DispatchOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay the first delivery attempt.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Set the absolute earliest delivery time.
    pub fn with_not_before(mut self, at: DateTime<Utc>) -> Self {
        self.not_before = Some(at);
        self
    }

    /// Set an explicit deduplication id.
    pub fn with_deduplication_id(mut self, id: impl Into<String>) -> Self {
        self.deduplication_id = Some(id.into());
        self
    }

    /// Deduplicate on message content.
    pub fn with_content_based_deduplication(mut self) -> Self {
        self.content_based_deduplication = true;
        self
    }

    /// Override the retry count for this dispatch only.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    /// Pick the target queue for a `queue()` dispatch.
    pub fn on_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = Some(queue.into());
        self
    }

    /// The target queue name, falling back to `"default"`.
    pub fn queue_name(&self) -> &str {
        self.queue.as_deref().unwrap_or(DEFAULT_QUEUE)
    }
}

/// A fully built outbound dispatch: what the hosted publish API receives.
///
/// Built fresh per call; no mutation, no retained identity.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    /// Callback URL the hosted service will POST back to, with the job key
    /// as a query parameter.
    pub url: String,

    /// HTTP method the hosted service uses for the callback.
    pub method: &'static str,

    /// Serialized payload.
    pub body: Value,

    /// Caller-supplied delivery options.
    pub options: DispatchOptions,
}

impl DispatchRequest {
    /// Build a request targeting `endpoint?job=<key>`.
    pub fn new(endpoint: &str, key: &str, body: Value, options: DispatchOptions) -> Self {
        Self {
            url: format!("{}?job={}", endpoint, key),
            method: "POST",
            body,
            options,
        }
    }
}

/// Acknowledgment returned by the hosted publish API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishAck {
    /// Identifier of the accepted message.
    pub message_id: String,

    /// Whether the hosted service dropped the message as a duplicate.
    #[serde(default)]
    pub deduplicated: bool,
}
