//! Boundary with the external robot runtime.
//!
//! The runtime is a black-box collaborator reachable only through the bus:
//! commands are fire-and-forget publishes, queries are envelope-correlated
//! request/reply exchanges with a timeout and no retry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use crate::messaging::{topics, Envelope, Event, EventBus, QosLevel};
use crate::topology::Topology;
use crate::{GantryError, Result};

/// Safety/armed state of the robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyState {
    Disarmed,
    Armed,
    Fault,
}

/// Scope of a parameter write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamScope {
    Local,
    Bridge,
}

/// Set an actuator's target position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetWrite {
    pub joint: String,
    pub value: f64,
}

/// Request execution of a named command with a key/value argument map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRequest {
    pub name: String,
    #[serde(default)]
    pub args: HashMap<String, String>,
}

/// Set a parameter's value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamWrite {
    pub name: String,
    pub value: serde_json::Value,
    pub scope: ParamScope,
}

/// A command the runtime can execute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Argument names the command accepts
    #[serde(default)]
    pub args: Vec<String>,
}

/// A parameter exposed by the runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamDescriptor {
    pub name: String,
    pub value: serde_json::Value,
    pub scope: ParamScope,
}

/// Joint telemetry payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JointStatePayload {
    pub positions: HashMap<String, f64>,
}

/// Client for driving the robot runtime over the bus.
#[derive(Clone)]
pub struct RobotClient {
    bus: Arc<EventBus>,
    source: String,
    query_timeout: Duration,
    next_query: Arc<AtomicU64>,
}

impl RobotClient {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            bus,
            source: "dashboard".to_string(),
            query_timeout: Duration::from_millis(2000),
            next_query: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Publish an actuator target position command.
    pub async fn set_joint_target(&self, joint: &str, value: f64) -> Result<()> {
        let payload = serde_json::to_value(TargetWrite {
            joint: joint.to_string(),
            value,
        })?;
        let event = Event::new("target", payload, self.source.clone());
        self.bus.publish(topics::COMMAND_TARGET, event).await?;
        Ok(())
    }

    /// Request execution of a named command.
    pub async fn execute(&self, name: &str, args: HashMap<String, String>) -> Result<()> {
        debug!(target: "robot", command = %name, "Issuing command");
        let payload = serde_json::to_value(CommandRequest {
            name: name.to_string(),
            args,
        })?;
        let event = Event::new("command", payload, self.source.clone());
        self.bus.publish(topics::COMMAND_EXECUTE, event).await?;
        Ok(())
    }

    /// Arm the robot.
    pub async fn arm(&self) -> Result<()> {
        self.execute("arm", HashMap::new()).await
    }

    /// Disarm the robot.
    pub async fn disarm(&self) -> Result<()> {
        self.execute("disarm", HashMap::new()).await
    }

    /// Write a parameter value.
    pub async fn set_parameter(
        &self,
        name: &str,
        value: serde_json::Value,
        scope: ParamScope,
    ) -> Result<()> {
        let payload = serde_json::to_value(ParamWrite {
            name: name.to_string(),
            value,
            scope,
        })?;
        let event = Event::new("param", payload, self.source.clone());
        self.bus.publish(topics::COMMAND_PARAM, event).await?;
        Ok(())
    }

    /// Fetch current joint positions.
    pub async fn query_joint_positions(&self) -> Result<HashMap<String, f64>> {
        let reply = self.query(topics::QUERY_JOINTS).await?;
        let state: JointStatePayload = reply.payload_as()?;
        Ok(state.positions)
    }

    /// Fetch current safety/armed state.
    pub async fn query_safety(&self) -> Result<SafetyState> {
        let reply = self.query(topics::QUERY_SAFETY).await?;
        Ok(reply.payload_as()?)
    }

    /// Fetch the robot topology (link/joint/visual definitions).
    pub async fn query_topology(&self) -> Result<Topology> {
        let reply = self.query(topics::QUERY_TOPOLOGY).await?;
        Ok(reply.payload_as()?)
    }

    /// Fetch the available commands.
    pub async fn query_commands(&self) -> Result<Vec<CommandDescriptor>> {
        let reply = self.query(topics::QUERY_COMMANDS).await?;
        Ok(reply.payload_as()?)
    }

    /// Fetch the available parameters.
    pub async fn query_parameters(&self) -> Result<Vec<ParamDescriptor>> {
        let reply = self.query(topics::QUERY_PARAMS).await?;
        Ok(reply.payload_as()?)
    }

    // One-shot request/reply: subscribe to the reply topic before publishing,
    // take the first reply, time out otherwise. No retry.
    async fn query(&self, topic: &str) -> Result<Event> {
        let n = self.next_query.fetch_add(1, Ordering::Relaxed);
        let correlation_id = format!("q_{}_{}", self.source, n);
        let env = Envelope::new(correlation_id.clone(), self.source.clone());

        let (sub_id, mut rx) = self
            .bus
            .subscribe(env.reply_to.clone(), vec![], QosLevel::Batched)
            .await?;

        let mut request = Event::new("query", serde_json::Value::Null, self.source.clone());
        env.attach_to_event(&mut request);
        self.bus.publish(topic, request).await?;

        let reply = timeout(self.query_timeout, rx.recv()).await;
        self.bus.unsubscribe(&sub_id).await?;

        match reply {
            Ok(Some(event)) => Ok(event),
            Ok(None) => Err(GantryError::EventBusError(format!(
                "reply channel closed for {topic}"
            ))),
            Err(_) => {
                warn!(target: "robot", topic = %topic, "Query timed out");
                Err(GantryError::QueryTimeout(topic.to_string()))
            }
        }
    }
}
