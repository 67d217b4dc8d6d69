use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use serde_json::Value;

use relay_core::error::Result;
use relay_core::job::{Job, JobRegistry};
use relay_core::signing::{SignatureVerifier, SIGNATURE_HEADER};

/// Shared state of the webhook entry point: the read-only job registry and
/// the signature verifier. Rebuilt per router, never mutated per request.
#[derive(Clone)]
pub struct WebhookState {
    registry: JobRegistry,
    verifier: SignatureVerifier,
}

impl WebhookState {
    /// Build the state from a job list; duplicate job keys are an error.
    pub fn new(jobs: Vec<Job>, verifier: SignatureVerifier) -> Result<Self> {
        Ok(Self {
            registry: JobRegistry::from_jobs(jobs)?,
            verifier,
        })
    }

    /// The registry served by this entry point.
    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }
}

/// Build a router exposing the webhook entry point at `/`.
pub fn webhook_router(jobs: Vec<Job>, verifier: SignatureVerifier) -> Result<Router> {
    let state = Arc::new(WebhookState::new(jobs, verifier)?);
    Ok(Router::new()
        .route("/", post(webhook_handler))
        .with_state(state))
}

/// Axum handler for the hosted service's signed callback.
///
/// Strict linear flow: parse, read body, verify, dispatch, execute. Four
/// failure exits, one success exit, no shared mutable state.
pub async fn webhook_handler(
    State(state): State<Arc<WebhookState>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let key = params.get("job");
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());

    let (Some(key), Some(signature)) = (key, signature) else {
        tracing::error!("missing signature or job key");
        return (StatusCode::BAD_REQUEST, "Missing signature or key").into_response();
    };

    let body: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            tracing::error!(error = %e, "invalid request body");
            return (StatusCode::BAD_REQUEST, "Invalid request body").into_response();
        }
    };

    // The verifier sees the re-serialized body, matching what was signed.
    if !state.verifier.verify(signature, &body.to_string()) {
        tracing::error!("invalid signature");
        return (StatusCode::BAD_REQUEST, "Invalid signature").into_response();
    }

    let Some(handler) = state.registry.get(key) else {
        tracing::error!(job = %key, "handler not registered");
        return (StatusCode::NOT_FOUND, "Handler not registered").into_response();
    };

    let payload = body.get("payload").cloned().unwrap_or(Value::Null);
    if let Err(e) = handler(payload).await {
        tracing::error!(job = %key, error = %e, "job handler failed");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    StatusCode::OK.into_response()
}
