// Event bus implementation
use crate::messaging::event::{Event, QosLevel};
use crate::Result;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Subscription information
#[derive(Debug, Clone)]
struct Subscription {
    id: String,
    kinds: Vec<String>,
    qos: QosLevel,
    sender: mpsc::Sender<Event>,
}

/// Event bus statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventBusStats {
    pub total_published: u64,
    pub total_delivered: u64,
    pub active_subscriptions: usize,
    pub backlog_size: usize,
    pub dropped_events: u64,
}

/// Topic-based pub/sub bus.
///
/// Topics are dot-separated paths (see [`crate::messaging::topics`]). Each
/// subscription gets its own bounded channel sized by QoS level; realtime
/// subscriptions shed load when the topic is backpressured.
pub struct EventBus {
    // Topic -> Subscriber list
    subscriptions: Arc<DashMap<String, Vec<Subscription>>>,

    // Statistics
    stats: Arc<DashMap<String, EventBusStats>>,

    // Backpressure threshold
    backpressure_threshold: usize,

    // Subscription id counter
    next_sub: AtomicU64,
}

impl EventBus {
    pub async fn new() -> Result<Self> {
        Ok(Self {
            subscriptions: Arc::new(DashMap::new()),
            stats: Arc::new(DashMap::new()),
            backpressure_threshold: 10_000,
            next_sub: AtomicU64::new(0),
        })
    }

    pub async fn start(&self) -> Result<()> {
        info!(target: "event_bus", "Event Bus started");
        Ok(())
    }

    pub async fn shutdown(&self) -> Result<()> {
        info!(target: "event_bus", "Event Bus shutting down");
        self.subscriptions.clear();
        Ok(())
    }

    /// Publish event to topic. Returns the number of subscribers delivered to.
    pub async fn publish(&self, topic: &str, mut event: Event) -> Result<u64> {
        event.path = topic.to_string();
        debug!(target: "event_bus", event_id = %event.id, topic = %topic, "Publishing event");

        // Update stats: published and backlog increase
        let current_backlog = self.update_stats_and_get(topic, |stats| {
            stats.total_published += 1;
            stats.backlog_size = stats.backlog_size.saturating_add(1);
            stats.backlog_size
        });
        let over_threshold = current_backlog >= self.backpressure_threshold;

        // Get subscribers
        if let Some(subs) = self.subscriptions.get(topic) {
            let mut delivered = 0;
            let mut dropped = 0;

            for sub in subs.value() {
                // Check event kind filtering
                if !sub.kinds.is_empty() && !sub.kinds.contains(&event.kind) {
                    continue;
                }

                // Handle based on QoS level
                match sub.qos {
                    QosLevel::Realtime => {
                        // Realtime mode: drop aggressively when backpressured, and drop on full queue
                        if over_threshold {
                            dropped += 1;
                            continue;
                        }
                        if sub.sender.try_send(event.clone()).is_ok() {
                            delivered += 1;
                        } else {
                            dropped += 1;
                            warn!(target: "event_bus", sub = %sub.id, "Dropped realtime event");
                        }
                    }
                    QosLevel::Batched | QosLevel::Background => {
                        // Queue (bounded mpsc); await if necessary
                        match sub.sender.send(event.clone()).await {
                            Ok(_) => delivered += 1,
                            Err(_) => {
                                dropped += 1;
                                warn!(target: "event_bus", sub = %sub.id, "Failed to send event");
                            }
                        }
                    }
                }
            }

            self.update_stats(topic, |stats| {
                stats.total_delivered += delivered;
                stats.dropped_events += dropped;
                stats.backlog_size = stats.backlog_size.saturating_sub(1);
            });

            Ok(delivered)
        } else {
            debug!(target: "event_bus", topic = %topic, "No subscriptions for topic");
            // Decrement backlog for the publish that had no subscribers
            self.update_stats(topic, |stats| {
                stats.backlog_size = stats.backlog_size.saturating_sub(1);
            });
            Ok(0)
        }
    }

    /// Subscribe to a topic, optionally filtering by event kind.
    pub async fn subscribe(
        &self,
        topic: String,
        kinds: Vec<String>,
        qos: QosLevel,
    ) -> Result<(String, mpsc::Receiver<Event>)> {
        let n = self.next_sub.fetch_add(1, Ordering::Relaxed);
        let subscription_id = format!("sub_{}_{}", topic, n);
        let cap = match qos {
            QosLevel::Realtime => 64,
            QosLevel::Batched => 1024,
            QosLevel::Background => 4096,
        };
        let (tx, rx) = mpsc::channel(cap);

        let subscription = Subscription {
            id: subscription_id.clone(),
            kinds,
            qos,
            sender: tx,
        };

        self.subscriptions
            .entry(topic.clone())
            .or_insert_with(Vec::new)
            .push(subscription);

        self.update_stats(&topic, |stats| {
            stats.active_subscriptions += 1;
        });

        info!(target: "event_bus", sub = %subscription_id, topic = %topic, "Created subscription");
        Ok((subscription_id, rx))
    }

    /// Unsubscribe from topic
    pub async fn unsubscribe(&self, subscription_id: &str) -> Result<()> {
        for mut entry in self.subscriptions.iter_mut() {
            let topic = entry.key().clone();
            let before = entry.value().len();
            entry.value_mut().retain(|sub| sub.id != subscription_id);
            if entry.value().len() < before {
                self.update_stats(&topic, |stats| {
                    stats.active_subscriptions = stats.active_subscriptions.saturating_sub(1);
                });
            }
        }

        info!(target: "event_bus", sub = %subscription_id, "Unsubscribed");
        Ok(())
    }

    /// Get stats
    pub fn get_stats(&self, topic: &str) -> Option<EventBusStats> {
        self.stats.get(topic).map(|s| s.clone())
    }

    // Update stats helper function
    fn update_stats<F>(&self, topic: &str, f: F)
    where
        F: FnOnce(&mut EventBusStats),
    {
        let mut entry = self
            .stats
            .entry(topic.to_string())
            .or_insert_with(EventBusStats::default);
        f(entry.value_mut());
    }

    // Update stats and return a value from the closure
    fn update_stats_and_get<F>(&self, topic: &str, f: F) -> usize
    where
        F: FnOnce(&mut EventBusStats) -> usize,
    {
        let mut entry = self
            .stats
            .entry(topic.to_string())
            .or_insert_with(EventBusStats::default);
        f(entry.value_mut())
    }
}
