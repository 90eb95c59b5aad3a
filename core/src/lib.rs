// Gantry Core Library
// Robot telemetry dashboard runtime

pub mod dashboard;
pub mod messaging;
pub mod robot;
pub mod scene;
pub mod sync;
pub mod telemetry;
pub mod topology;

// Export core types
pub use messaging::{Envelope, Event, EventBus, EventBusStats, QosLevel};
pub use robot::{RobotClient, SafetyState};
pub use scene::{RobotScene, SceneError};
pub use sync::{PoseSender, PoseSync, PoseUpdate, UpdateSource};
pub use topology::{Joint, JointType, Link, Topology};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GantryError {
    #[error("Event bus error: {0}")]
    EventBusError(String),

    #[error("Scene error: {0}")]
    SceneError(#[from] scene::SceneError),

    #[error("Query timed out: {0}")]
    QueryTimeout(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
pub type Result<T> = std::result::Result<T, GantryError>;

use std::sync::Arc;

/// Core runtime
pub struct Gantry {
    pub event_bus: Arc<EventBus>,
    pub event_log: telemetry::EventLog,
}

impl Gantry {
    pub async fn new() -> Result<Self> {
        Ok(Self {
            event_bus: Arc::new(EventBus::new().await?),
            event_log: telemetry::EventLog::new(1000),
        })
    }

    pub async fn start(&mut self) -> Result<()> {
        tracing::info!("Starting Gantry...");

        self.event_bus.start().await?;

        tracing::info!("Gantry started successfully");
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        tracing::info!("Shutting down Gantry...");

        self.event_bus.shutdown().await?;

        tracing::info!("Gantry shut down successfully");
        Ok(())
    }
}
