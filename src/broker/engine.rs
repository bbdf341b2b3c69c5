//! In-process pub/sub broker
//!
//! `Broker` implements [`PubSubTransport`] entirely in memory. It stands in
//! for an external message bus in the binary and the tests:
//! - every subscription gets a bounded delivery queue and its own task that
//!   invokes the subscriber callback, so callbacks never run on the
//!   publisher's task
//! - `publish` snapshots the queues under the lock, then awaits each enqueue
//!   with the lock released; delivery per subscription is FIFO and lossless
//! - topics with no subscribers left are dropped

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::broker::topic::{SubscriberId, Topic};
use crate::bus::{BusSubscription, DeliveryCallback, PubSubTransport};
use crate::utils::error::BusError;

#[derive(Debug, Default)]
struct BrokerState {
    topics: HashMap<String, Topic>,
    closed: bool,
}

#[derive(Debug, Clone)]
pub struct Broker {
    state: Arc<Mutex<BrokerState>>,
    delivery_buffer: usize,
}

impl Broker {
    pub const DEFAULT_DELIVERY_BUFFER: usize = 1024;

    pub fn new() -> Self {
        Self::with_delivery_buffer(Self::DEFAULT_DELIVERY_BUFFER)
    }

    pub fn with_delivery_buffer(delivery_buffer: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(BrokerState::default())),
            delivery_buffer: delivery_buffer.max(1),
        }
    }

    /// Number of live subscriptions on `subject`.
    pub fn subscriber_count(&self, subject: &str) -> usize {
        self.state
            .lock()
            .topics
            .get(subject)
            .map_or(0, |topic| topic.subscribers.len())
    }

    pub fn subject_count(&self) -> usize {
        self.state.lock().topics.len()
    }

    /// Drop every subscription and refuse further traffic.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.topics.clear();
        info!("broker closed");
    }

    fn remove_subscriber(&self, subject: &str, id: &str) -> bool {
        let mut state = self.state.lock();
        let Some(topic) = state.topics.get_mut(subject) else {
            return false;
        };
        let removed = topic.unsubscribe(id);
        if topic.is_empty() {
            state.topics.remove(subject);
        }
        removed
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PubSubTransport for Broker {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), BusError> {
        let queues = {
            let state = self.state.lock();
            if state.closed {
                return Err(BusError::Closed);
            }
            match state.topics.get(subject) {
                Some(topic) => topic.queues(),
                None => Vec::new(),
            }
        };

        debug!(subject, subscribers = queues.len(), "publishing");

        for queue in queues {
            // A closed queue means the subscription went away after the snapshot.
            let _ = queue.send(payload.clone()).await;
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        subject: &str,
        callback: DeliveryCallback,
    ) -> Result<Box<dyn BusSubscription>, BusError> {
        let id: SubscriberId = Uuid::new_v4().to_string();
        let (tx, mut rx) = mpsc::channel::<Bytes>(self.delivery_buffer);

        {
            let mut state = self.state.lock();
            if state.closed {
                return Err(BusError::Closed);
            }
            state
                .topics
                .entry(subject.to_string())
                .or_insert_with(|| Topic::new(subject))
                .subscribe(id.clone(), tx);
        }

        let task_subject = subject.to_string();
        tokio::spawn(async move {
            while let Some(payload) = rx.recv().await {
                callback(payload);
            }
            debug!(subject = %task_subject, "delivery task finished");
        });

        Ok(Box::new(LocalSubscription {
            broker: self.clone(),
            subject: subject.to_string(),
            id,
        }))
    }
}

/// Subscription handle returned by [`Broker::subscribe`].
#[derive(Debug)]
pub struct LocalSubscription {
    broker: Broker,
    subject: String,
    id: SubscriberId,
}

#[async_trait]
impl BusSubscription for LocalSubscription {
    fn subject(&self) -> &str {
        &self.subject
    }

    async fn unsubscribe(self: Box<Self>) -> Result<(), BusError> {
        if !self.broker.remove_subscriber(&self.subject, &self.id) {
            debug!(subject = %self.subject, "subscription already gone");
        }
        Ok(())
    }
}
