//! Pluggable per-connection message handling.
//!
//! A handler gets three hooks: connect (before the pumps start), every
//! inbound frame, and disconnect (after the connection left the hub). Which
//! handler a connection uses is decided by its route.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::bus::PubSubTransport;
use crate::client::Session;
use crate::hub::Hub;
use crate::registry::TopicRegistry;
use crate::router::envelope::{DocumentEvent, EditPayload};
use crate::router::forward::forwarding_callback;
use crate::transport::message::Frame;
use crate::utils::error::GatewayError;

#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn on_connect(&self, session: &Session) -> Result<(), GatewayError>;

    /// Errors are logged by the read loop; the connection stays open.
    async fn on_message(&self, session: &Session, frame: Frame) -> Result<(), GatewayError>;

    async fn on_disconnect(&self, session: &Session) -> Result<(), GatewayError>;
}

/// Sends every frame straight back to its sender.
pub struct EchoHandler {
    hub: Arc<Hub>,
}

impl EchoHandler {
    pub fn new(hub: Arc<Hub>) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl MessageHandler for EchoHandler {
    async fn on_connect(&self, session: &Session) -> Result<(), GatewayError> {
        info!(client_id = %session.client_id, "echo connection opened");
        Ok(())
    }

    async fn on_message(&self, session: &Session, frame: Frame) -> Result<(), GatewayError> {
        debug!(client_id = %session.client_id, bytes = frame.data.len(), "echoing");
        self.hub.send_to(&session.client_id, frame)?;
        Ok(())
    }

    async fn on_disconnect(&self, session: &Session) -> Result<(), GatewayError> {
        info!(client_id = %session.client_id, "echo connection closed");
        Ok(())
    }
}

/// Collaborative document handling.
///
/// Connecting joins the document's topic in the registry, inbound edits are
/// published on the bus tagged with their author, and disconnecting leaves
/// the topic again.
pub struct DocumentHandler {
    hub: Arc<Hub>,
    registry: Arc<TopicRegistry>,
    bus: Arc<dyn PubSubTransport>,
}

impl DocumentHandler {
    pub fn new(hub: Arc<Hub>, registry: Arc<TopicRegistry>, bus: Arc<dyn PubSubTransport>) -> Self {
        Self { hub, registry, bus }
    }

    fn topic<'a>(&self, session: &'a Session) -> Result<&'a str, GatewayError> {
        session
            .document_id()
            .ok_or_else(|| GatewayError::MissingDocument(session.client_id.clone()))
    }
}

#[async_trait]
impl MessageHandler for DocumentHandler {
    async fn on_connect(&self, session: &Session) -> Result<(), GatewayError> {
        let topic = self.topic(session)?;
        let connections = self
            .registry
            .join(topic, forwarding_callback(self.hub.clone()))
            .await?;

        info!(client_id = %session.client_id, document_id = topic, connections, "user joined document");
        Ok(())
    }

    async fn on_message(&self, session: &Session, frame: Frame) -> Result<(), GatewayError> {
        let topic = self.topic(session)?;
        let payload: EditPayload = serde_json::from_slice(&frame.data)?;
        let event = DocumentEvent::new(topic, &session.client_id, payload);

        let subject = self.registry.subjects().for_topic(topic);
        self.bus.publish(&subject, event.to_bytes()?).await?;

        debug!(
            client_id = %session.client_id,
            %subject,
            action = %event.payload.action,
            position = event.payload.position,
            "published edit"
        );
        Ok(())
    }

    async fn on_disconnect(&self, session: &Session) -> Result<(), GatewayError> {
        let topic = self.topic(session)?;
        let remaining = self.registry.leave(topic).await?;

        info!(client_id = %session.client_id, document_id = topic, remaining, "user left document");
        Ok(())
    }
}
