//! Per-connection message types.
//!
//! A [`Frame`] is what travels through a connection's outbound queue and what
//! the read loop hands to a message handler. Control frames (ping, pong,
//! close) stay inside the transport and never become frames.

use bytes::Bytes;
use tungstenite::protocol::Message as WsMessage;

/// Payload kind, carried as the WebSocket opcode value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    Text = 1,
    Binary = 2,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: MessageKind,
    pub data: Bytes,
}

impl Frame {
    pub fn text(data: impl Into<Bytes>) -> Self {
        Self {
            kind: MessageKind::Text,
            data: data.into(),
        }
    }

    pub fn binary(data: impl Into<Bytes>) -> Self {
        Self {
            kind: MessageKind::Binary,
            data: data.into(),
        }
    }

    /// Convert an inbound WebSocket message; `None` for control messages.
    pub fn from_ws(msg: WsMessage) -> Option<Self> {
        let kind = match &msg {
            WsMessage::Text(_) => MessageKind::Text,
            WsMessage::Binary(_) => MessageKind::Binary,
            _ => return None,
        };
        Some(Self {
            kind,
            data: msg.into_data(),
        })
    }
}

impl From<Frame> for WsMessage {
    /// Text frames that are not valid UTF-8 go out as binary rather than
    /// being rejected.
    fn from(frame: Frame) -> Self {
        match frame.kind {
            MessageKind::Text => match String::from_utf8(frame.data.to_vec()) {
                Ok(text) => WsMessage::text(text),
                Err(_) => WsMessage::binary(frame.data),
            },
            MessageKind::Binary => WsMessage::binary(frame.data),
        }
    }
}
