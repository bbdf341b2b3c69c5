//! Message routing between client connections and the bus.
//!
//! [`Router`] owns the shared pieces (hub, topic registry, bus) and hands out
//! the handlers a connection can be served with:
//! - client → bus: the read loop passes frames to the handler, which for
//!   documents publishes an envelope tagged with the sender
//! - bus → clients: the registry's delivery callback decodes the envelope
//!   and broadcasts to the topic, skipping the sender

pub mod envelope;
pub mod forward;
pub mod handler;
pub mod pump;

use std::fmt::Display;
use std::sync::Arc;

use futures::{Sink, Stream};
use tungstenite::protocol::Message as WsMessage;

use crate::bus::{PubSubTransport, SubjectScheme};
use crate::client::Session;
use crate::config::Settings;
use crate::hub::Hub;
use crate::registry::TopicRegistry;
use crate::utils::error::GatewayError;

pub use envelope::{DocumentEvent, EditPayload};
pub use handler::{DocumentHandler, EchoHandler, MessageHandler};

pub struct Router {
    hub: Arc<Hub>,
    registry: Arc<TopicRegistry>,
    bus: Arc<dyn PubSubTransport>,
    queue_capacity: usize,
}

impl Router {
    pub fn new(bus: Arc<dyn PubSubTransport>, subjects: SubjectScheme, queue_capacity: usize) -> Self {
        Self {
            hub: Arc::new(Hub::new()),
            registry: Arc::new(TopicRegistry::new(bus.clone(), subjects)),
            bus,
            queue_capacity,
        }
    }

    pub fn from_settings(bus: Arc<dyn PubSubTransport>, settings: &Settings) -> Self {
        Self::new(
            bus,
            SubjectScheme::from(&settings.bus),
            settings.hub.queue_capacity,
        )
    }

    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    pub fn registry(&self) -> &Arc<TopicRegistry> {
        &self.registry
    }

    pub fn echo_handler(&self) -> Arc<dyn MessageHandler> {
        Arc::new(EchoHandler::new(self.hub.clone()))
    }

    pub fn document_handler(&self) -> Arc<dyn MessageHandler> {
        Arc::new(DocumentHandler::new(
            self.hub.clone(),
            self.registry.clone(),
            self.bus.clone(),
        ))
    }

    /// Serve one connection with `handler` until it disconnects.
    pub async fn serve<W, E>(
        &self,
        socket: W,
        session: Session,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), GatewayError>
    where
        W: Stream<Item = Result<WsMessage, E>> + Sink<WsMessage, Error = E> + Send + 'static,
        E: Display + Send + 'static,
    {
        pump::serve_connection(socket, session, self.hub.clone(), handler, self.queue_capacity).await
    }

    /// Drop every bus subscription; used on shutdown.
    pub async fn shutdown(&self) {
        self.registry.close().await;
    }
}

#[cfg(test)]
mod tests;
