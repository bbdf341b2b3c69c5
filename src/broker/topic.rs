//! Subject bookkeeping for the in-process broker.
//!
//! A `Topic` maps subscription ids to the sending side of each
//! subscription's delivery queue. Callers synchronize access through the
//! broker lock.

use std::collections::HashMap;

use bytes::Bytes;
use tokio::sync::mpsc;

pub type SubscriberId = String;

#[derive(Debug, Default)]
pub struct Topic {
    pub name: String,
    pub subscribers: HashMap<SubscriberId, mpsc::Sender<Bytes>>,
}

impl Topic {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            subscribers: HashMap::new(),
        }
    }

    pub fn subscribe(&mut self, id: SubscriberId, queue: mpsc::Sender<Bytes>) {
        self.subscribers.insert(id, queue);
    }

    /// Returns `true` if the subscriber was present.
    pub fn unsubscribe(&mut self, id: &str) -> bool {
        self.subscribers.remove(id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Clone out the delivery queues so publishing can await outside the lock.
    pub fn queues(&self) -> Vec<mpsc::Sender<Bytes>> {
        self.subscribers.values().cloned().collect()
    }
}
