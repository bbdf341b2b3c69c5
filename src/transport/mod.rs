//! The `transport` module is the WebSocket boundary of the gateway.
//!
//! It defines the per-connection frame type, resolves each handshake to a
//! route and an identity, and hands the upgraded socket to the router.

pub mod message;
pub mod route;
pub mod websocket;

pub use message::{Frame, MessageKind};
pub use route::{Route, RouteError};
pub use websocket::{serve, start_websocket_server};
