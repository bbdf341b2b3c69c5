//! The publish/subscribe contract the gateway relies on.
//!
//! Any backend that can publish bytes to a subject and deliver a subject's
//! messages to a callback can sit behind [`PubSubTransport`]. Delivery is
//! at-least-once per subscription and happens on tasks owned by the
//! transport, never on the publisher's task.

pub mod subject;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::utils::error::BusError;

pub use subject::SubjectScheme;

/// Callback invoked for every message delivered on a subscription.
pub type DeliveryCallback = Arc<dyn Fn(Bytes) + Send + Sync>;

#[async_trait]
pub trait PubSubTransport: Send + Sync {
    /// Publish `payload` on `subject`.
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), BusError>;

    /// Start delivering messages published on `subject` to `callback`.
    async fn subscribe(
        &self,
        subject: &str,
        callback: DeliveryCallback,
    ) -> Result<Box<dyn BusSubscription>, BusError>;
}

/// Handle to one live bus subscription.
#[async_trait]
pub trait BusSubscription: Send + Sync {
    fn subject(&self) -> &str;

    /// Stop delivery. Consumes the handle, so a subscription is torn down at
    /// most once.
    async fn unsubscribe(self: Box<Self>) -> Result<(), BusError>;
}
