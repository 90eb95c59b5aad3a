// Tracing initialisation and the recent-activity log backing the dashboard.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing_subscriber::EnvFilter;

use crate::messaging::Event;

/// Initialise the global tracing subscriber (env-filter + fmt).
///
/// Safe to call more than once; subsequent calls are no-ops.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

/// One recorded bus event, trimmed for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub topic: String,
    pub kind: String,
    pub source: String,
    /// First 100 chars of the serialized payload
    pub payload_preview: String,
}

impl LogEntry {
    pub fn from_event(event: &Event) -> Self {
        let payload = event.payload.to_string();
        let payload_preview = payload.chars().take(100).collect();
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            topic: event.path.clone(),
            kind: event.kind.clone(),
            source: event.source.clone(),
            payload_preview,
        }
    }
}

/// Bounded in-memory ring of recent bus activity.
#[derive(Clone)]
pub struct EventLog {
    entries: Arc<RwLock<VecDeque<LogEntry>>>,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub async fn record(&self, entry: LogEntry) {
        let mut entries = self.entries.write().await;
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Most recent entries, newest last.
    pub async fn get_recent(&self, limit: usize) -> Vec<LogEntry> {
        let entries = self.entries.read().await;
        let skip = entries.len().saturating_sub(limit);
        entries.iter().skip(skip).cloned().collect()
    }

    pub async fn count(&self) -> usize {
        self.entries.read().await.len()
    }
}
