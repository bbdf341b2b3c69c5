//! # docgate
//!
//! `docgate` is a real-time fan-out gateway for collaborative documents. It
//! bridges many concurrent WebSocket connections to a shared
//! publish/subscribe bus, multiplexed by document id.
//!
//! ## Core Modules
//!
//! - `hub`: the live connection set and non-blocking fan-out with
//!   backpressure eviction.
//! - `registry`: one reference-counted bus subscription per document.
//! - `router`: per-connection read/write loops, message handlers and the
//!   bus → clients forwarding path.
//! - `bus`: the publish/subscribe contract; `broker` is its in-process
//!   implementation.
//! - `client`: per-connection session data and hub entries.
//! - `transport`: the WebSocket boundary (frames, routes, accept loop).
//! - `config`, `utils`: configuration loading, errors and logging.

pub mod broker;
pub mod bus;
pub mod client;
pub mod config;
pub mod hub;
pub mod registry;
pub mod router;
pub mod transport;
pub mod utils;

#[cfg(test)]
mod tests;
