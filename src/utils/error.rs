//! Error types for the gateway.
//!
//! Failures are scoped the same way the runtime is: a `BusError` belongs to a
//! join/leave/publish caller, a `HubError` to a single connection, and
//! `GatewayError` is what handlers and the transport layer propagate.

use thiserror::Error;

/// Failures reported by a [`crate::bus::PubSubTransport`] implementation.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("failed to subscribe to {subject}: {reason}")]
    Subscribe { subject: String, reason: String },

    #[error("failed to publish to {subject}: {reason}")]
    Publish { subject: String, reason: String },

    #[error("failed to unsubscribe from {subject}: {reason}")]
    Unsubscribe { subject: String, reason: String },

    #[error("bus is closed")]
    Closed,
}

/// Failures of a direct send through the [`crate::hub::Hub`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HubError {
    #[error("connection {0} is not registered")]
    NotRegistered(String),

    #[error("outbound queue of {0} is full")]
    QueueFull(String),

    #[error("outbound queue of {0} is closed")]
    QueueClosed(String),
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Bus(#[from] BusError),

    #[error(transparent)]
    Hub(#[from] HubError),

    #[error("malformed message: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("connection {0} has no document id")]
    MissingDocument(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
