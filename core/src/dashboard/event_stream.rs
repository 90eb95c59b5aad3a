// Event streaming for Dashboard
//
// Uses tokio broadcast channel to stream events to multiple SSE clients

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::messaging::Event;

/// Event sent to Dashboard clients
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DashboardEvent {
    /// Timestamp (ISO 8601)
    pub timestamp: String,
    /// Event type
    pub event_type: DashboardEventType,
    /// Topic path
    pub topic: String,
    /// Producer identity
    pub source: String,
    /// Payload preview (first 100 chars)
    pub payload_preview: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DashboardEventType {
    /// Joint telemetry or local edit applied
    JointState,
    /// Safety/armed state transition
    SafetyChanged,
    /// Parameter value changed
    ParameterChanged,
    /// Command issued to the runtime
    CommandIssued,
    /// Any other bus event
    EventPublished,
}

impl DashboardEvent {
    /// Classify a bus event for the dashboard stream.
    pub fn from_bus_event(event: &Event) -> Self {
        let event_type = match event.kind.as_str() {
            "joint_state" | "target" => DashboardEventType::JointState,
            "safety" => DashboardEventType::SafetyChanged,
            "param" => DashboardEventType::ParameterChanged,
            "command" => DashboardEventType::CommandIssued,
            _ => DashboardEventType::EventPublished,
        };
        let payload = event.payload.to_string();
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            event_type,
            topic: event.path.clone(),
            source: event.source.clone(),
            payload_preview: payload.chars().take(100).collect(),
        }
    }
}

/// Event broadcaster for Dashboard
#[derive(Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<DashboardEvent>,
}

impl EventBroadcaster {
    /// Create a new broadcaster with buffer size
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Broadcast an event to all subscribers
    pub fn broadcast(&self, event: DashboardEvent) {
        // Ignore error if no subscribers
        let _ = self.sender.send(event);
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.sender.subscribe()
    }

    /// Get number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(1000) // Buffer last 1000 events
    }
}

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::messaging::{topics, EventBus, QosLevel};
use crate::telemetry::{EventLog, LogEntry};

/// Mirror robot bus traffic into the dashboard stream and the recent log.
///
/// One background task per observed topic; tasks run until the bus is
/// dropped.
pub fn spawn_bus_mirror(
    bus: Arc<EventBus>,
    broadcaster: EventBroadcaster,
    log: EventLog,
) -> Vec<JoinHandle<()>> {
    let observed = [
        topics::JOINT_STATES,
        topics::SAFETY,
        topics::PARAMS,
        topics::COMMAND_TARGET,
        topics::COMMAND_EXECUTE,
        topics::COMMAND_PARAM,
    ];

    observed
        .into_iter()
        .map(|topic| {
            let bus = Arc::clone(&bus);
            let broadcaster = broadcaster.clone();
            let log = log.clone();
            tokio::spawn(async move {
                let sub = bus
                    .subscribe(topic.to_string(), vec![], QosLevel::Background)
                    .await;
                let (_id, mut rx) = match sub {
                    Ok(pair) => pair,
                    Err(e) => {
                        tracing::warn!(target: "dashboard", topic = %topic, error = %e, "Mirror subscription failed");
                        return;
                    }
                };
                while let Some(event) = rx.recv().await {
                    broadcaster.broadcast(DashboardEvent::from_bus_event(&event));
                    log.record(LogEntry::from_event(&event)).await;
                }
            })
        })
        .collect()
}
