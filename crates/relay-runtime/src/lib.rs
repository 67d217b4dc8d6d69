pub mod client;
pub mod gateway;
pub mod manager;

pub use client::HttpPublisher;
pub use gateway::{webhook_router, WebhookServer, WebhookServerConfig, WebhookState};
pub use manager::{JobHandle, JobManager, Queue, QueueOptions};
