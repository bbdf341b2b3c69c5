//! Bus envelope for document edits.
//!
//! The envelope is transient: it lives on the bus between one gateway's
//! publish and every gateway's delivery, and is persisted nowhere.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// What a client sends on a document connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditPayload {
    pub action: String,
    pub position: i64,
    pub data: String,
}

/// An edit as published on the bus, tagged with its origin.
///
/// `user_id` is the originating client id; forwarding uses it to keep the
/// edit from echoing back to its author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentEvent {
    pub document_id: String,
    pub user_id: String,
    /// Unix seconds.
    pub timestamp: i64,
    pub payload: EditPayload,
}

impl DocumentEvent {
    pub fn new(document_id: &str, user_id: &str, payload: EditPayload) -> Self {
        Self {
            document_id: document_id.to_string(),
            user_id: user_id.to_string(),
            timestamp: chrono::Utc::now().timestamp(),
            payload,
        }
    }

    pub fn to_bytes(&self) -> Result<Bytes, serde_json::Error> {
        serde_json::to_vec(self).map(Bytes::from)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}
