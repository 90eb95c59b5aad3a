// Tagged bus messages: a topic path plus a structured payload.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Delivery quality-of-service level for a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QosLevel {
    /// Drop aggressively under backpressure; never block the publisher.
    Realtime,
    /// Bounded queue; publisher awaits when the queue is full.
    Batched,
    /// Large bounded queue for slow consumers.
    Background,
}

/// A message on the bus: a topic path and a typed payload.
///
/// Payloads are plain structured records (`serde_json::Value`), not a
/// versioned schema. The `kind` field discriminates payload shapes within a
/// topic; `metadata` carries envelope fields for query/reply correlation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    /// Topic path the event was published on (set by the bus).
    pub path: String,
    /// Payload discriminator, e.g. "joint_state", "safety", "command".
    pub kind: String,
    pub payload: Value,
    /// Logical identity of the producer, e.g. "runtime.sensors", "scene.local".
    pub source: String,
    pub timestamp_ms: i64,
    pub metadata: HashMap<String, String>,
}

impl Event {
    pub fn new(kind: impl Into<String>, payload: Value, source: impl Into<String>) -> Self {
        Self {
            id: next_event_id(),
            path: String::new(),
            kind: kind.into(),
            payload,
            source: source.into(),
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            metadata: HashMap::new(),
        }
    }

    /// Deserialize the payload into a concrete record.
    pub fn payload_as<T: serde::de::DeserializeOwned>(&self) -> crate::Result<T> {
        Ok(serde_json::from_value(self.payload.clone())?)
    }
}

// Process-local id: monotonic counter plus wall-clock nanos
fn next_event_id() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!("evt_{:x}_{:x}", now, n)
}
