use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::hub::Hub;
use crate::registry::TopicCallback;
use crate::router::envelope::DocumentEvent;
use crate::transport::message::Frame;

/// Fan a bus delivery for `topic` out to the topic's connections.
///
/// The originating client named in the envelope is skipped. A delivery that
/// does not decode is still forwarded, to every member of the topic.
pub fn forward_delivery(hub: &Hub, topic: &str, data: Bytes) -> usize {
    let origin = match DocumentEvent::from_bytes(&data) {
        Ok(event) => Some(event.user_id).filter(|id| !id.is_empty()),
        Err(e) => {
            warn!(document_id = topic, error = %e, "undecodable bus message, forwarding unfiltered");
            None
        }
    };

    let delivered = hub.broadcast_to_topic(topic, Frame::text(data), origin.as_deref());
    debug!(document_id = topic, origin = ?origin, delivered, "forwarded bus message");
    delivered
}

/// Registry callback that forwards every delivery through `hub`.
pub fn forwarding_callback(hub: Arc<Hub>) -> TopicCallback {
    Arc::new(move |topic: &str, data: Bytes| {
        forward_delivery(&hub, topic, data);
    })
}
