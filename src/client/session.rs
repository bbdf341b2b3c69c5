use std::net::SocketAddr;

/// Caller-supplied identity, unique per live session.
pub type ClientId = String;

/// Well-known per-connection metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionMetadata {
    /// Topic the connection is scoped to; `None` for topic-less routes.
    pub document_id: Option<String>,
    pub remote_addr: Option<SocketAddr>,
}

/// Identity and metadata of one live connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub client_id: ClientId,
    pub metadata: SessionMetadata,
}

impl Session {
    pub fn new(client_id: impl Into<ClientId>) -> Self {
        Self {
            client_id: client_id.into(),
            metadata: SessionMetadata::default(),
        }
    }

    pub fn with_document(mut self, document_id: impl Into<String>) -> Self {
        self.metadata.document_id = Some(document_id.into());
        self
    }

    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.metadata.remote_addr = Some(addr);
        self
    }

    pub fn document_id(&self) -> Option<&str> {
        self.metadata.document_id.as_deref()
    }
}
