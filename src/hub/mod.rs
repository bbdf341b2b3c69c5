//! Connection hub
//!
//! The [`Hub`] is the single authority over which connections are live. All
//! membership changes and fan-out go through its internal lock:
//! - a client id present in the set always has an open outbound queue
//! - removing an entry and closing its queue happen together (the entry owns
//!   the queue's only sender)
//! - broadcasts never wait on a slow client: a connection whose queue is full
//!   is evicted on the spot

pub mod engine;

pub use engine::Hub;
