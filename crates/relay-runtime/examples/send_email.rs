use std::time::Duration;

use serde::{Deserialize, Serialize};

use relay_core::{DispatchOptions, RelayConfig, RetryPolicy, SignatureVerifier, SigningKeys};
use relay_runtime::{JobManager, WebhookServer, WebhookServerConfig};

#[derive(Debug, Serialize, Deserialize)]
struct WelcomeEmail {
    to: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = RelayConfig::new(
        std::env::var("RELAY_TOKEN")?,
        "https://example.com/api/queue",
    )
    .with_queues(["default"])
    .with_retry(RetryPolicy::new(3));

    let manager = JobManager::new(config)?;
    manager.provision().await?;

    let send_email = manager.create_job("send-email", |email: WelcomeEmail| async move {
        tracing::info!(to = %email.to, "sending welcome email");
        Ok(())
    });

    // Ask the hosted service to deliver the job back to our endpoint.
    let ack = send_email
        .trigger(
            &WelcomeEmail {
                to: "a@b.com".to_string(),
            },
            DispatchOptions::new().with_delay(Duration::from_secs(60)),
        )
        .await?;
    tracing::info!(message_id = %ack.message_id, "job accepted");

    // Serve the signed callback.
    let verifier = SignatureVerifier::new(SigningKeys::new(std::env::var("RELAY_SIGNING_KEY")?));
    let server = WebhookServer::new(
        WebhookServerConfig::default(),
        vec![send_email.as_job()],
        verifier,
    )?;
    server.run().await?;

    Ok(())
}
