//! The `client` module defines what the gateway knows about one connected
//! client: its [`Session`] (identity plus typed metadata) and the hub-side
//! [`Client`] entry that owns the sending half of its outbound queue.

pub mod handle;
pub mod session;

pub use handle::Client;
pub use session::{ClientId, Session, SessionMetadata};
