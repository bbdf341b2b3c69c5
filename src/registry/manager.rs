use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::bus::{BusSubscription, DeliveryCallback, PubSubTransport, SubjectScheme};
use crate::utils::error::BusError;

/// Receives every bus delivery for a topic, tagged with the topic.
pub type TopicCallback = Arc<dyn Fn(&str, Bytes) + Send + Sync>;

struct TopicSubscription {
    subscription: Box<dyn BusSubscription>,
    connections: usize,
}

/// Reference-counted bus subscriptions, keyed by topic.
///
/// Join and leave hold the write lock for their whole duration, including
/// the bus subscribe/unsubscribe call, so the count and the subscription can
/// never disagree.
pub struct TopicRegistry {
    bus: Arc<dyn PubSubTransport>,
    subjects: SubjectScheme,
    entries: RwLock<HashMap<String, TopicSubscription>>,
}

impl TopicRegistry {
    pub fn new(bus: Arc<dyn PubSubTransport>, subjects: SubjectScheme) -> Self {
        Self {
            bus,
            subjects,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn subjects(&self) -> &SubjectScheme {
        &self.subjects
    }

    /// Count one more connection on `topic`, subscribing on the bus if this
    /// is the first one. `on_message` is only used when the subscription is
    /// created. Returns the new connection count.
    ///
    /// If the bus subscribe fails no entry is created.
    pub async fn join(&self, topic: &str, on_message: TopicCallback) -> Result<usize, BusError> {
        let mut entries = self.entries.write().await;

        let entry = match entries.entry(topic.to_string()) {
            Entry::Occupied(occupied) => occupied.into_mut(),
            Entry::Vacant(vacant) => {
                let subject = self.subjects.for_topic(topic);
                let callback_topic = topic.to_string();
                let callback: DeliveryCallback = Arc::new(move |payload: Bytes| {
                    debug!(document_id = %callback_topic, bytes = payload.len(), "bus delivery");
                    on_message(&callback_topic, payload);
                });

                let subscription = self.bus.subscribe(&subject, callback).await?;
                info!(document_id = topic, %subject, "created bus subscription");
                vacant.insert(TopicSubscription {
                    subscription,
                    connections: 0,
                })
            }
        };
        entry.connections += 1;
        let count = entry.connections;

        info!(document_id = topic, connections = count, "connection joined topic");
        Ok(count)
    }

    /// Count one connection less on `topic`, unsubscribing from the bus when
    /// the count reaches zero.
    ///
    /// Leaving a topic with no entry is a no-op. If the bus unsubscribe fails
    /// the entry is still removed and the error returned.
    pub async fn leave(&self, topic: &str) -> Result<usize, BusError> {
        let mut entries = self.entries.write().await;

        let Some(entry) = entries.get_mut(topic) else {
            debug!(document_id = topic, "leave for unknown topic ignored");
            return Ok(0);
        };
        entry.connections = entry.connections.saturating_sub(1);
        let count = entry.connections;

        info!(document_id = topic, connections = count, "connection left topic");
        if count > 0 {
            return Ok(count);
        }

        if let Some(entry) = entries.remove(topic) {
            let subject = entry.subscription.subject().to_string();
            if let Err(e) = entry.subscription.unsubscribe().await {
                warn!(document_id = topic, %subject, error = %e, "bus unsubscribe failed");
                return Err(e);
            }
            info!(document_id = topic, %subject, "removed bus subscription");
        }
        Ok(0)
    }

    /// Number of connections currently counted on `topic`.
    pub async fn connection_count(&self, topic: &str) -> usize {
        self.entries
            .read()
            .await
            .get(topic)
            .map_or(0, |entry| entry.connections)
    }

    pub async fn is_subscribed(&self, topic: &str) -> bool {
        self.entries.read().await.contains_key(topic)
    }

    pub async fn active_subscriptions(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Connection count per subscribed topic.
    pub async fn stats(&self) -> HashMap<String, usize> {
        self.entries
            .read()
            .await
            .iter()
            .map(|(topic, entry)| (topic.clone(), entry.connections))
            .collect()
    }

    /// Tear down every bus subscription. Errors are logged, not returned.
    pub async fn close(&self) {
        let drained: Vec<(String, TopicSubscription)> =
            self.entries.write().await.drain().collect();

        for (topic, entry) in drained {
            if let Err(e) = entry.subscription.unsubscribe().await {
                warn!(document_id = %topic, error = %e, "failed to close bus subscription");
            }
        }
        info!("closed all bus subscriptions");
    }
}
