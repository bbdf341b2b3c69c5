use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::{Client, ClientId};
use crate::transport::message::Frame;
use crate::utils::error::HubError;

#[derive(Debug, Default)]
pub struct Hub {
    clients: Mutex<HashMap<ClientId, Client>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to the live set.
    ///
    /// Client ids are expected to be unique; registering an id that is
    /// already live replaces the old entry, which closes the old queue.
    pub fn register(&self, client: Client) {
        let client_id = client.id().to_string();
        let document_id = client.document_id().map(str::to_string);

        let previous = self.clients.lock().insert(client_id.clone(), client);
        if previous.is_some() {
            warn!(%client_id, "replaced an already registered connection");
        }
        info!(%client_id, document_id = ?document_id, "connection registered");
    }

    /// Remove a connection and close its outbound queue.
    ///
    /// Unregistering an absent connection is a no-op. Returns whether an
    /// entry was removed.
    pub fn unregister(&self, client_id: &str) -> bool {
        let removed = self.clients.lock().remove(client_id);
        match removed {
            Some(client) => {
                info!(client_id, document_id = ?client.document_id(), "connection unregistered");
                true
            }
            None => false,
        }
    }

    /// Remove `client_id` only while it still refers to the registration
    /// `connection_id`. An entry that has since been replaced by a newer
    /// connection with the same client id is left alone.
    pub fn unregister_connection(&self, client_id: &str, connection_id: Uuid) -> bool {
        let removed = {
            let mut clients = self.clients.lock();
            let current = clients
                .get(client_id)
                .is_some_and(|client| client.connection_id == connection_id);
            if current { clients.remove(client_id) } else { None }
        };
        match removed {
            Some(client) => {
                info!(client_id, document_id = ?client.document_id(), "connection unregistered");
                true
            }
            None => {
                debug!(client_id, %connection_id, "registration already gone or replaced");
                false
            }
        }
    }

    /// Deliver `frame` to every connection on `topic`, skipping `exclude`.
    ///
    /// Returns the number of connections the frame was queued for.
    /// Connections whose queue is full (or already closed) are evicted.
    pub fn broadcast_to_topic(&self, topic: &str, frame: Frame, exclude: Option<&str>) -> usize {
        self.fan_out(&frame, |client| {
            client.document_id() == Some(topic) && exclude != Some(client.id())
        })
    }

    /// Deliver `frame` to every live connection, with the same eviction
    /// policy as [`Hub::broadcast_to_topic`].
    pub fn broadcast(&self, frame: Frame) -> usize {
        self.fan_out(&frame, |_| true)
    }

    fn fan_out(&self, frame: &Frame, mut selected: impl FnMut(&Client) -> bool) -> usize {
        let mut delivered = 0;
        let mut evicted = Vec::new();

        self.clients.lock().retain(|client_id, client| {
            if !selected(client) {
                return true;
            }
            match client.sender.try_send(frame.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) | Err(TrySendError::Closed(_)) => {
                    evicted.push(client_id.clone());
                    false
                }
            }
        });

        for client_id in &evicted {
            warn!(%client_id, "evicted unresponsive connection");
        }
        debug!(delivered, evicted = evicted.len(), "broadcast complete");
        delivered
    }

    /// Queue `frame` for a single connection without blocking.
    ///
    /// Unlike a broadcast, a full queue is reported to the caller and the
    /// connection stays registered.
    pub fn send_to(&self, client_id: &str, frame: Frame) -> Result<(), HubError> {
        let clients = self.clients.lock();
        let client = clients
            .get(client_id)
            .ok_or_else(|| HubError::NotRegistered(client_id.to_string()))?;

        client.sender.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => HubError::QueueFull(client_id.to_string()),
            TrySendError::Closed(_) => HubError::QueueClosed(client_id.to_string()),
        })
    }

    pub fn contains(&self, client_id: &str) -> bool {
        self.clients.lock().contains_key(client_id)
    }

    pub fn len(&self) -> usize {
        self.clients.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.lock().is_empty()
    }

    /// Ids of the connections currently scoped to `topic`.
    pub fn topic_members(&self, topic: &str) -> Vec<ClientId> {
        self.clients
            .lock()
            .values()
            .filter(|client| client.document_id() == Some(topic))
            .map(|client| client.id().to_string())
            .collect()
    }
}
