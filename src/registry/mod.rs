//! Topic subscription registry
//!
//! Turns any number of per-connection topic joins into exactly one bus
//! subscription per topic. A bus subscription for a topic exists if and only
//! if that topic's connection count is above zero; the last connection to
//! leave tears it down.

pub mod manager;

pub use manager::{TopicCallback, TopicRegistry};
