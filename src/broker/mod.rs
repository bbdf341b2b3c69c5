//! In-process implementation of the pub/sub bus.
//!
//! Used when no external bus is configured and by the tests; it honours the
//! same contract as any other [`crate::bus::PubSubTransport`].

pub mod engine;
pub mod topic;

pub use engine::Broker;
