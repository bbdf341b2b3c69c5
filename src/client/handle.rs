use tokio::sync::mpsc;
use uuid::Uuid;

use crate::client::session::Session;
use crate::transport::message::Frame;

/// A connection as registered with the [`crate::hub::Hub`].
///
/// The entry holds the only sender of the connection's bounded outbound
/// queue. Dropping it closes the queue, which is how the hub tells the write
/// loop to send a close frame and stop.
///
/// `connection_id` tells apart two registrations that share a client id.
#[derive(Debug)]
pub struct Client {
    pub session: Session,
    pub sender: mpsc::Sender<Frame>,
    pub connection_id: Uuid,
}

impl Client {
    /// Create a hub entry together with the receiving half of its outbound
    /// queue. A capacity of zero is raised to one.
    pub fn new(session: Session, capacity: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self {
                session,
                sender,
                connection_id: Uuid::new_v4(),
            },
            receiver,
        )
    }

    pub fn id(&self) -> &str {
        &self.session.client_id
    }

    pub fn document_id(&self) -> Option<&str> {
        self.session.document_id()
    }
}
