//! Simulated robot runtime.
//!
//! Stands in for the external robotics runtime: answers queries, accepts
//! commands, and publishes sinusoidal joint telemetry. Reached only through
//! the bus, exactly like the real collaborator would be.

use std::collections::HashMap;
use std::f64::consts::FRAC_PI_2;
use std::sync::Arc;

use gantry_core::messaging::{topics, Envelope, Event, EventBus, QosLevel};
use gantry_core::robot::{
    CommandDescriptor, CommandRequest, JointStatePayload, ParamDescriptor, ParamScope, ParamWrite,
    TargetWrite,
};
use gantry_core::topology::{Geometry, Joint, JointType, Link, Material, Pose, Topology, Visual};
use gantry_core::SafetyState;
use serde_json::json;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

const SOURCE: &str = "runtime.sim";

/// Three-link arm: base -> shoulder -> upper_arm -> elbow -> forearm,
/// plus a continuously spinning wrist driven by the telemetry loop.
pub fn arm_topology() -> Topology {
    let steel = Material {
        name: "steel".to_string(),
        color: [0.6, 0.62, 0.65, 1.0],
    };

    let mut topo = Topology::new();
    topo.add_link(Link::new("base").with_visual(Visual {
        origin: Pose::default(),
        geometry: Geometry::Cylinder {
            radius: 0.12,
            length: 0.06,
        },
        material: Some(steel.clone()),
    }));
    topo.add_link(Link::new("upper_arm").with_visual(Visual {
        origin: Pose::from_position([0.0, 0.0, 0.15]),
        geometry: Geometry::Box {
            size: [0.06, 0.06, 0.3],
        },
        material: Some(steel.clone()),
    }));
    topo.add_link(Link::new("forearm").with_visual(Visual {
        origin: Pose::from_position([0.0, 0.0, 0.125]),
        geometry: Geometry::Box {
            size: [0.05, 0.05, 0.25],
        },
        material: Some(steel),
    }));
    topo.add_link(Link::new("tool").with_visual(Visual {
        origin: Pose::default(),
        geometry: Geometry::Sphere { radius: 0.03 },
        material: None,
    }));

    topo.add_joint(
        Joint::new("shoulder", JointType::Revolute, "base", "upper_arm")
            .with_origin(Pose::from_position([0.0, 0.0, 0.03]))
            .with_axis([0.0, 0.0, 1.0])
            .with_limits(-FRAC_PI_2, FRAC_PI_2),
    );
    topo.add_joint(
        Joint::new("elbow", JointType::Revolute, "upper_arm", "forearm")
            .with_origin(Pose::from_position([0.0, 0.0, 0.3]))
            .with_axis([0.0, 1.0, 0.0])
            .with_limits(-2.0, 2.0),
    );
    topo.add_joint(
        Joint::new("wrist", JointType::Continuous, "forearm", "tool")
            .with_origin(Pose::from_position([0.0, 0.0, 0.25]))
            .with_axis([0.0, 0.0, 1.0]),
    );
    topo
}

struct SimState {
    positions: HashMap<String, f64>,
    safety: SafetyState,
    params: HashMap<String, serde_json::Value>,
}

pub struct SimRuntime {
    bus: Arc<EventBus>,
    topology: Arc<Topology>,
    state: Arc<Mutex<SimState>>,
    telemetry_period_ms: u64,
}

impl SimRuntime {
    pub fn new(bus: Arc<EventBus>, telemetry_period_ms: u64) -> Self {
        let topology = Arc::new(arm_topology());
        let positions = topology
            .joints
            .keys()
            .map(|name| (name.clone(), 0.0))
            .collect();
        let mut params = HashMap::new();
        params.insert("max_speed".to_string(), json!(1.5));
        params.insert("sim.gravity".to_string(), json!(9.81));
        Self {
            bus,
            topology,
            state: Arc::new(Mutex::new(SimState {
                positions,
                safety: SafetyState::Disarmed,
                params,
            })),
            telemetry_period_ms,
        }
    }

    pub fn topology(&self) -> Arc<Topology> {
        Arc::clone(&self.topology)
    }

    /// Spawn all runtime tasks: query responders, command handlers, telemetry.
    pub async fn start(&self) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();
        handles.push(self.spawn_query_responders().await);
        handles.push(self.spawn_command_handler().await);
        handles.push(self.spawn_target_handler().await);
        handles.push(self.spawn_param_handler().await);
        handles.push(self.spawn_telemetry().await);
        info!(target: "sim", "Simulated runtime started");
        handles
    }

    async fn subscribe(&self, topic: &str) -> tokio::sync::mpsc::Receiver<Event> {
        let (_id, rx) = self
            .bus
            .subscribe(topic.to_string(), vec![], QosLevel::Batched)
            .await
            .expect("subscribe");
        rx
    }

    async fn spawn_query_responders(&self) -> JoinHandle<()> {
        let bus = Arc::clone(&self.bus);
        let topology = Arc::clone(&self.topology);
        let state = Arc::clone(&self.state);

        let mut joints_rx = self.subscribe(topics::QUERY_JOINTS).await;
        let mut safety_rx = self.subscribe(topics::QUERY_SAFETY).await;
        let mut topo_rx = self.subscribe(topics::QUERY_TOPOLOGY).await;
        let mut commands_rx = self.subscribe(topics::QUERY_COMMANDS).await;
        let mut params_rx = self.subscribe(topics::QUERY_PARAMS).await;

        tokio::spawn(async move {
            loop {
                let (request, payload) = tokio::select! {
                    Some(req) = joints_rx.recv() => {
                        let positions = state.lock().await.positions.clone();
                        (req, json!(JointStatePayload { positions }))
                    }
                    Some(req) = safety_rx.recv() => {
                        let safety = state.lock().await.safety;
                        (req, json!(safety))
                    }
                    Some(req) = topo_rx.recv() => {
                        (req, json!(topology.as_ref()))
                    }
                    Some(req) = commands_rx.recv() => {
                        (req, json!(command_catalog()))
                    }
                    Some(req) = params_rx.recv() => {
                        let params = state.lock().await.params.clone();
                        let catalog: Vec<ParamDescriptor> = params
                            .into_iter()
                            .map(|(name, value)| ParamDescriptor {
                                name,
                                value,
                                scope: ParamScope::Local,
                            })
                            .collect();
                        (req, json!(catalog))
                    }
                    else => break,
                };

                let env = Envelope::from_event(&request);
                let mut reply = Event::new("reply", payload, SOURCE);
                env.attach_to_event(&mut reply);
                let _ = bus.publish(&env.reply_to, reply).await;
            }
        })
    }

    async fn spawn_command_handler(&self) -> JoinHandle<()> {
        let bus = Arc::clone(&self.bus);
        let state = Arc::clone(&self.state);
        let mut rx = self.subscribe(topics::COMMAND_EXECUTE).await;

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let Ok(request) = event.payload_as::<CommandRequest>() else {
                    warn!(target: "sim", "Malformed command payload");
                    continue;
                };
                let new_safety = match request.name.as_str() {
                    "arm" => Some(SafetyState::Armed),
                    "disarm" => Some(SafetyState::Disarmed),
                    other => {
                        info!(target: "sim", command = %other, "Ignoring unknown command");
                        None
                    }
                };
                if let Some(safety) = new_safety {
                    state.lock().await.safety = safety;
                    let evt = Event::new("safety", json!(safety), SOURCE);
                    let _ = bus.publish(topics::SAFETY, evt).await;
                }
            }
        })
    }

    async fn spawn_target_handler(&self) -> JoinHandle<()> {
        let state = Arc::clone(&self.state);
        let mut rx = self.subscribe(topics::COMMAND_TARGET).await;

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let Ok(target) = event.payload_as::<TargetWrite>() else {
                    warn!(target: "sim", "Malformed target payload");
                    continue;
                };
                let mut state = state.lock().await;
                if state.safety != SafetyState::Armed {
                    info!(target: "sim", joint = %target.joint, "Target ignored while disarmed");
                    continue;
                }
                // The sim actuator reaches its target instantly
                state.positions.insert(target.joint, target.value);
            }
        })
    }

    async fn spawn_param_handler(&self) -> JoinHandle<()> {
        let bus = Arc::clone(&self.bus);
        let state = Arc::clone(&self.state);
        let mut rx = self.subscribe(topics::COMMAND_PARAM).await;

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let Ok(write) = event.payload_as::<ParamWrite>() else {
                    warn!(target: "sim", "Malformed param payload");
                    continue;
                };
                state
                    .lock()
                    .await
                    .params
                    .insert(write.name.clone(), write.value.clone());
                let evt = Event::new("param", json!(write), SOURCE);
                let _ = bus.publish(topics::PARAMS, evt).await;
            }
        })
    }

    async fn spawn_telemetry(&self) -> JoinHandle<()> {
        let bus = Arc::clone(&self.bus);
        let state = Arc::clone(&self.state);
        let period = self.telemetry_period_ms;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_millis(period));
            let mut t = 0.0f64;
            loop {
                interval.tick().await;
                t += period as f64 / 1000.0;

                let positions = {
                    let mut state = state.lock().await;
                    // The wrist has no physical limit switch and just spins
                    state.positions.insert("wrist".to_string(), t % (2.0 * std::f64::consts::PI));
                    state.positions.clone()
                };

                let evt = Event::new(
                    "joint_state",
                    json!(JointStatePayload { positions }),
                    "runtime.sensors",
                );
                let _ = bus.publish(topics::JOINT_STATES, evt).await;
            }
        })
    }
}

fn command_catalog() -> Vec<CommandDescriptor> {
    vec![
        CommandDescriptor {
            name: "arm".to_string(),
            description: "Enable actuators".to_string(),
            args: vec![],
        },
        CommandDescriptor {
            name: "disarm".to_string(),
            description: "Disable actuators".to_string(),
            args: vec![],
        },
    ]
}
