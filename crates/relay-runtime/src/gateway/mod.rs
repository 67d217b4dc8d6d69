pub mod handler;
pub mod server;

pub use handler::{webhook_handler, webhook_router, WebhookState};
pub use server::{WebhookServer, WebhookServerConfig};
