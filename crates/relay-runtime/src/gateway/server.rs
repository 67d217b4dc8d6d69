use std::net::SocketAddr;
use std::sync::Arc;

use axum::{middleware, routing::post, Router};
use tower_http::trace::TraceLayer;

use relay_core::error::Result;
use relay_core::job::Job;
use relay_core::signing::SignatureVerifier;

use super::handler::{webhook_handler, WebhookState};

/// Webhook server configuration.
#[derive(Debug, Clone)]
pub struct WebhookServerConfig {
    /// Port to listen on.
    pub port: u16,
    /// Path the hosted service delivers callbacks to.
    pub path: String,
}

impl Default for WebhookServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            path: "/api/queue".to_string(),
        }
    }
}

/// HTTP server wrapping the webhook entry point.
pub struct WebhookServer {
    config: WebhookServerConfig,
    state: Arc<WebhookState>,
}

impl WebhookServer {
    /// Create a server from a job list and a signature verifier.
    pub fn new(
        config: WebhookServerConfig,
        jobs: Vec<Job>,
        verifier: SignatureVerifier,
    ) -> Result<Self> {
        Ok(Self {
            config,
            state: Arc::new(WebhookState::new(jobs, verifier)?),
        })
    }

    /// Build the Axum router.
    pub fn router(&self) -> Router {
        Router::new()
            .route(&self.config.path, post(webhook_handler))
            .with_state(self.state.clone())
            .layer(middleware::from_fn(request_id_middleware))
            .layer(TraceLayer::new_for_http())
    }

    /// Get the socket address to bind to.
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.config.port))
    }

    /// Run the server (blocking).
    pub async fn run(self) -> std::io::Result<()> {
        let addr = self.addr();
        let router = self.router();

        tracing::info!("webhook server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await
    }
}

/// Middleware that assigns a request id and echoes it on the response.
async fn request_id_middleware(
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(String::from)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let mut response = next.run(req).await;

    if let Ok(value) = request_id.parse() {
        response.headers_mut().insert("x-request-id", value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::signing::SigningKeys;

    #[test]
    fn test_config_default() {
        let config = WebhookServerConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.path, "/api/queue");
    }

    #[test]
    fn test_duplicate_jobs_rejected_at_construction() {
        let jobs = vec![
            Job::new("a", |_: serde_json::Value| async { Ok(()) }),
            Job::new("a", |_: serde_json::Value| async { Ok(()) }),
        ];
        let verifier = SignatureVerifier::new(SigningKeys::new("k"));

        let result = WebhookServer::new(WebhookServerConfig::default(), jobs, verifier);
        assert!(result.is_err());
    }
}
