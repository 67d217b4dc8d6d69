use relay_core::dispatch::{DispatchRequest, PublishAck};
use relay_core::error::{RelayError, Result};
use relay_core::publish::{PublishFuture, Publisher};

const HEADER_METHOD: &str = "Relay-Method";
const HEADER_DELAY: &str = "Relay-Delay";
const HEADER_NOT_BEFORE: &str = "Relay-Not-Before";
const HEADER_DEDUPLICATION_ID: &str = "Relay-Deduplication-Id";
const HEADER_CONTENT_BASED_DEDUPLICATION: &str = "Relay-Content-Based-Deduplication";
const HEADER_RETRIES: &str = "Relay-Retries";
const HEADER_BACKOFF: &str = "Relay-Backoff";

/// Publisher backed by the hosted service's REST API.
///
/// Submits messages with bearer-token auth and maps delivery options onto
/// `Relay-*` request headers. All queueing semantics live on the other side
/// of these calls.
#[derive(Clone)]
pub struct HttpPublisher {
    http: reqwest::Client,
    api_base: String,
    token: String,
}

impl std::fmt::Debug for HttpPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPublisher")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl HttpPublisher {
    /// Create a publisher from a credential token and the service REST base.
    pub fn new(token: impl Into<String>, api_base: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(RelayError::Config(
                "publish token must not be empty".to_string(),
            ));
        }

        Ok(Self {
            http: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    /// The service REST base this publisher talks to.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn apply_options(
        &self,
        builder: reqwest::RequestBuilder,
        request: &DispatchRequest,
    ) -> reqwest::RequestBuilder {
        let mut builder = builder
            .bearer_auth(&self.token)
            .header(HEADER_METHOD, request.method);

        let options = &request.options;
        if let Some(delay) = options.delay {
            builder = builder.header(HEADER_DELAY, format!("{}s", delay.as_secs()));
        }
        if let Some(at) = options.not_before {
            builder = builder.header(HEADER_NOT_BEFORE, at.timestamp().to_string());
        }
        if let Some(id) = &options.deduplication_id {
            builder = builder.header(HEADER_DEDUPLICATION_ID, id);
        }
        if options.content_based_deduplication {
            builder = builder.header(HEADER_CONTENT_BASED_DEDUPLICATION, "true");
        }
        if let Some(retries) = options.retries {
            builder = builder.header(HEADER_RETRIES, retries.to_string());
        }
        if let Some(backoff) = options.backoff {
            builder = builder.header(HEADER_BACKOFF, backoff.as_str());
        }

        builder
    }

    async fn send_json(&self, url: String, request: DispatchRequest) -> Result<PublishAck> {
        let response = self
            .apply_options(self.http.post(&url), &request)
            .json(&request.body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RelayError::Publish {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<PublishAck>().await?)
    }
}

impl Publisher for HttpPublisher {
    fn publish_json(&self, request: DispatchRequest) -> PublishFuture<'_, PublishAck> {
        Box::pin(async move {
            let url = format!("{}/v2/publish/{}", self.api_base, request.url);
            self.send_json(url, request).await
        })
    }

    fn enqueue_json(&self, queue: &str, request: DispatchRequest) -> PublishFuture<'_, PublishAck> {
        let url = format!("{}/v2/enqueue/{}/{}", self.api_base, queue, request.url);
        Box::pin(async move { self.send_json(url, request).await })
    }

    fn upsert_queue(&self, name: &str, parallelism: u32) -> PublishFuture<'_, ()> {
        let name = name.to_string();
        Box::pin(async move {
            let url = format!("{}/v2/queues", self.api_base);
            let response = self
                .http
                .post(&url)
                .bearer_auth(&self.token)
                .json(&serde_json::json!({
                    "queueName": name,
                    "parallelism": parallelism,
                }))
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(RelayError::Publish {
                    status: status.as_u16(),
                    message,
                });
            }

            Ok(())
        })
    }
}
