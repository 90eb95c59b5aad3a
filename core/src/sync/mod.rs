//! Pose synchronisation: two producers, one consumer.
//!
//! Authoritative telemetry from the robot runtime and speculative local edits
//! from direct user interaction both feed a single update channel. The
//! consumer task exclusively owns the [`RobotScene`] and applies updates in
//! arrival order; there is no conflict detection, the most recent write wins.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::messaging::{topics, Event, EventBus};
use crate::scene::RobotScene;

/// Where a pose update came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateSource {
    /// Authoritative sensor reading from the robot runtime.
    Telemetry,
    /// Speculative edit from direct user interaction.
    Local,
}

/// A self-contained state transition: a partial joint mapping and its origin.
#[derive(Debug, Clone)]
pub struct PoseUpdate {
    pub source: UpdateSource,
    pub positions: HashMap<String, f64>,
}

/// Cloneable producer handle feeding the update channel.
#[derive(Clone)]
pub struct PoseSender {
    tx: mpsc::Sender<PoseUpdate>,
}

impl PoseSender {
    /// Queue an authoritative telemetry update.
    pub async fn telemetry(&self, positions: HashMap<String, f64>) {
        let _ = self
            .tx
            .send(PoseUpdate {
                source: UpdateSource::Telemetry,
                positions,
            })
            .await;
    }

    /// Queue a speculative local edit.
    pub async fn local(&self, positions: HashMap<String, f64>) {
        let _ = self
            .tx
            .send(PoseUpdate {
                source: UpdateSource::Local,
                positions,
            })
            .await;
    }
}

/// Single-consumer update loop owning the scene.
pub struct PoseSync {
    scene: RobotScene,
    bus: Arc<EventBus>,
    rx: mpsc::Receiver<PoseUpdate>,
    snapshot_tx: watch::Sender<HashMap<String, f64>>,
}

impl PoseSync {
    /// Wire a scene to the bus. Returns the sync loop, the producer handle,
    /// and a watch receiver carrying the latest full joint mapping.
    pub fn new(
        scene: RobotScene,
        bus: Arc<EventBus>,
    ) -> (Self, PoseSender, watch::Receiver<HashMap<String, f64>>) {
        let (tx, rx) = mpsc::channel(256);
        let (snapshot_tx, snapshot_rx) = watch::channel(scene.positions());
        (
            Self {
                scene,
                bus,
                rx,
                snapshot_tx,
            },
            PoseSender { tx },
            snapshot_rx,
        )
    }

    /// Spawn the consumer loop. Runs until every producer handle is dropped.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        info!(target: "pose_sync", root = %self.scene.root_link(), "Pose sync loop started");
        while let Some(update) = self.rx.recv().await {
            self.apply(update).await;
        }
        info!(target: "pose_sync", "Pose sync loop stopped");
    }

    async fn apply(&mut self, update: PoseUpdate) {
        let changed = self.scene.set_all(&update.positions);
        if !changed {
            return;
        }

        // Publish the full mapping for snapshot readers
        let _ = self.snapshot_tx.send(self.scene.positions());

        // A local edit is applied immediately for responsiveness and
        // independently broadcast outward; the scene does not wait for
        // acknowledgement. Telemetry that arrives later simply overwrites it.
        if update.source == UpdateSource::Local {
            debug!(target: "pose_sync", "Broadcasting local edit");
            let event = Event::new(
                "joint_state",
                json!({ "positions": update.positions }),
                "scene.local",
            );
            let _ = self.bus.publish(topics::JOINT_STATES, event).await;
        }
    }
}

/// Subscribe to authoritative joint telemetry and pump it into the channel.
///
/// Events sourced from the scene's own local-edit broadcast are skipped so a
/// local edit is not applied twice.
pub fn spawn_telemetry_pump(bus: Arc<EventBus>, sender: PoseSender) -> JoinHandle<()> {
    tokio::spawn(async move {
        let sub = bus
            .subscribe(
                topics::JOINT_STATES.to_string(),
                vec!["joint_state".to_string()],
                crate::messaging::QosLevel::Realtime,
            )
            .await;
        let (_id, mut rx) = match sub {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(target: "pose_sync", error = %e, "Telemetry subscription failed");
                return;
            }
        };
        while let Some(event) = rx.recv().await {
            if event.source == "scene.local" {
                continue;
            }
            let positions = event
                .payload
                .get("positions")
                .and_then(|v| serde_json::from_value::<HashMap<String, f64>>(v.clone()).ok());
            if let Some(positions) = positions {
                sender.telemetry(positions).await;
            }
        }
    })
}
