pub mod config;
pub mod dispatch;
pub mod error;
pub mod job;
pub mod publish;
pub mod signing;

#[cfg(feature = "testing")]
pub mod testing;

pub use config::{Backoff, RelayConfig, RetryPolicy, DEFAULT_API_BASE};
pub use dispatch::{DispatchOptions, DispatchRequest, PublishAck, DEFAULT_QUEUE};
pub use error::{RelayError, Result};
pub use job::{BoxedJobHandler, Job, JobRegistry};
pub use publish::{PublishFuture, Publisher};
pub use signing::{SignatureVerifier, SigningKeys, SIGNATURE_HEADER};
