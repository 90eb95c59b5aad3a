use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::messaging::event::Event;

/// Reserved metadata keys for correlation semantics.
///
/// These keys are used in `Event.metadata` to carry envelope information for
/// the query/reply pattern between the dashboard and the robot runtime.
pub mod keys {
    /// Correlation identifier linking replies to requests
    pub const CORRELATION_ID: &str = "correlation_id";
    /// Logical identity of the message sender (e.g., "dashboard", "runtime")
    pub const SENDER: &str = "sender";
    /// Canonical reply topic for responses
    pub const REPLY_TO: &str = "reply_to";
    /// Timestamp in milliseconds since epoch
    pub const TIMESTAMP_MS: &str = "ts";
}

/// Builds the canonical reply topic for a correlation id.
///
/// # Examples
///
/// ```
/// use gantry_core::messaging::reply_topic;
///
/// assert_eq!(reply_topic("q-123"), "reply.q-123");
/// ```
pub fn reply_topic(correlation_id: &str) -> String {
    format!("reply.{correlation_id}")
}

/// Correlation envelope riding inside `Event.metadata`.
///
/// Standardizes sender identity and reply routing for queries against the
/// robot runtime (topology, joint positions, safety state, catalogs). A query
/// publisher subscribes to `reply_topic(correlation_id)` before publishing;
/// the responder extracts the envelope, answers on `reply_to`, and preserves
/// the correlation id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Envelope {
    /// Correlation identifier linking a reply to its originating request
    pub correlation_id: String,
    /// Logical identity of the sender
    pub sender: String,
    /// Canonical reply topic for responses
    pub reply_to: String,
    /// Creation timestamp in milliseconds since epoch
    pub timestamp_ms: i64,
}

impl Envelope {
    /// Creates a new envelope with the canonical reply topic.
    ///
    /// # Examples
    ///
    /// ```
    /// use gantry_core::Envelope;
    ///
    /// let env = Envelope::new("q-42", "dashboard");
    /// assert_eq!(env.correlation_id, "q-42");
    /// assert_eq!(env.reply_to, "reply.q-42");
    /// ```
    pub fn new(correlation_id: impl Into<String>, sender: impl Into<String>) -> Self {
        let correlation_id = correlation_id.into();
        Self {
            reply_to: reply_topic(&correlation_id),
            correlation_id,
            sender: sender.into(),
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Constructs an envelope from a metadata map with fallbacks for missing keys.
    ///
    /// Uses `fallback_event_id` as the correlation id if not present in metadata.
    pub fn from_metadata(meta: &HashMap<String, String>, fallback_event_id: &str) -> Self {
        let correlation_id = meta
            .get(keys::CORRELATION_ID)
            .cloned()
            .unwrap_or_else(|| fallback_event_id.to_string());
        let sender = meta.get(keys::SENDER).cloned().unwrap_or_default();
        let reply_to = meta
            .get(keys::REPLY_TO)
            .cloned()
            .unwrap_or_else(|| reply_topic(&correlation_id));
        let timestamp_ms = meta
            .get(keys::TIMESTAMP_MS)
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());
        Self {
            correlation_id,
            sender,
            reply_to,
            timestamp_ms,
        }
    }

    /// Writes envelope fields into a metadata map.
    pub fn apply_to_metadata(&self, meta: &mut HashMap<String, String>) {
        meta.insert(keys::CORRELATION_ID.into(), self.correlation_id.clone());
        meta.insert(keys::SENDER.into(), self.sender.clone());
        meta.insert(keys::REPLY_TO.into(), self.reply_to.clone());
        meta.insert(keys::TIMESTAMP_MS.into(), self.timestamp_ms.to_string());
    }

    /// Extracts envelope from an Event with fallback to the event id.
    pub fn from_event(evt: &Event) -> Self {
        Self::from_metadata(&evt.metadata, &evt.id)
    }

    /// Writes envelope into Event metadata (mutates in place).
    pub fn attach_to_event(&self, evt: &mut Event) {
        self.apply_to_metadata(&mut evt.metadata);
    }
}
