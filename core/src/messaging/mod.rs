//! Messaging layer: Event Bus, Envelope correlation, and topic conventions.
//!
//! This module provides the pub/sub plumbing between the dashboard and the
//! external robot runtime:
//! - `EventBus`: Topic-based pub/sub with QoS and backpressure
//! - `Envelope`: Correlation metadata for query/reply over the bus
//! - `topics`: Canonical topic path constants

pub mod envelope;
pub mod event;
pub mod event_bus;
pub mod topics;

// Re-export key types for ergonomic access
pub use envelope::{reply_topic, Envelope};
pub use event::{Event, QosLevel};
pub use event_bus::{EventBus, EventBusStats};
