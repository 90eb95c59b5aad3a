use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use gantry_core::messaging::{topics, Envelope, Event, EventBus, QosLevel};
use gantry_core::robot::{CommandRequest, ParamScope, ParamWrite, TargetWrite};
use gantry_core::topology::{Joint, JointType, Link, Topology};
use gantry_core::{GantryError, RobotClient, SafetyState};
use serde_json::json;

// Stub responder: answer the first request on `topic` with `payload`.
fn spawn_responder(bus: Arc<EventBus>, topic: &'static str, payload: serde_json::Value) {
    tokio::spawn(async move {
        let (_id, mut rx) = bus
            .subscribe(topic.to_string(), vec![], QosLevel::Batched)
            .await
            .unwrap();
        if let Some(request) = rx.recv().await {
            let env = Envelope::from_event(&request);
            let mut reply = Event::new("reply", payload, "runtime.stub");
            env.attach_to_event(&mut reply);
            bus.publish(&env.reply_to, reply).await.unwrap();
        }
    });
}

#[tokio::test]
async fn execute_publishes_command_request() {
    let bus = Arc::new(EventBus::new().await.unwrap());
    let (_id, mut rx) = bus
        .subscribe(topics::COMMAND_EXECUTE.to_string(), vec![], QosLevel::Batched)
        .await
        .unwrap();

    let client = RobotClient::new(Arc::clone(&bus));
    let mut args = HashMap::new();
    args.insert("speed".to_string(), "0.5".to_string());
    client.execute("home", args).await.unwrap();

    let event = tokio::time::timeout(Duration::from_millis(500), rx.recv())
        .await
        .expect("timeout")
        .expect("channel closed");
    let request: CommandRequest = event.payload_as().unwrap();
    assert_eq!(request.name, "home");
    assert_eq!(request.args.get("speed").map(String::as_str), Some("0.5"));
}

#[tokio::test]
async fn arm_and_disarm_are_named_commands() {
    let bus = Arc::new(EventBus::new().await.unwrap());
    let (_id, mut rx) = bus
        .subscribe(topics::COMMAND_EXECUTE.to_string(), vec![], QosLevel::Batched)
        .await
        .unwrap();

    let client = RobotClient::new(Arc::clone(&bus));
    client.arm().await.unwrap();
    client.disarm().await.unwrap();

    let first: CommandRequest = rx.recv().await.unwrap().payload_as().unwrap();
    let second: CommandRequest = rx.recv().await.unwrap().payload_as().unwrap();
    assert_eq!(first.name, "arm");
    assert_eq!(second.name, "disarm");
}

#[tokio::test]
async fn set_joint_target_publishes_target_write() {
    let bus = Arc::new(EventBus::new().await.unwrap());
    let (_id, mut rx) = bus
        .subscribe(topics::COMMAND_TARGET.to_string(), vec![], QosLevel::Batched)
        .await
        .unwrap();

    let client = RobotClient::new(Arc::clone(&bus));
    client.set_joint_target("shoulder", 0.75).await.unwrap();

    let target: TargetWrite = rx.recv().await.unwrap().payload_as().unwrap();
    assert_eq!(target.joint, "shoulder");
    assert_eq!(target.value, 0.75);
}

#[tokio::test]
async fn set_parameter_carries_scope() {
    let bus = Arc::new(EventBus::new().await.unwrap());
    let (_id, mut rx) = bus
        .subscribe(topics::COMMAND_PARAM.to_string(), vec![], QosLevel::Batched)
        .await
        .unwrap();

    let client = RobotClient::new(Arc::clone(&bus));
    client
        .set_parameter("max_speed", json!(2.0), ParamScope::Bridge)
        .await
        .unwrap();

    let write: ParamWrite = rx.recv().await.unwrap().payload_as().unwrap();
    assert_eq!(write.name, "max_speed");
    assert_eq!(write.scope, ParamScope::Bridge);
}

#[tokio::test]
async fn query_safety_round_trip() {
    let bus = Arc::new(EventBus::new().await.unwrap());
    spawn_responder(Arc::clone(&bus), topics::QUERY_SAFETY, json!("armed"));
    // Let the responder subscribe before the query goes out
    tokio::time::sleep(Duration::from_millis(20)).await;

    let client = RobotClient::new(Arc::clone(&bus));
    let safety = client.query_safety().await.unwrap();
    assert_eq!(safety, SafetyState::Armed);
}

#[tokio::test]
async fn query_topology_round_trip() {
    let mut topo = Topology::new();
    topo.add_link(Link::new("base"));
    topo.add_link(Link::new("arm"));
    topo.add_joint(Joint::new("shoulder", JointType::Revolute, "base", "arm"));

    let bus = Arc::new(EventBus::new().await.unwrap());
    spawn_responder(Arc::clone(&bus), topics::QUERY_TOPOLOGY, json!(topo));
    tokio::time::sleep(Duration::from_millis(20)).await;

    let client = RobotClient::new(Arc::clone(&bus));
    let fetched = client.query_topology().await.unwrap();
    assert_eq!(fetched, topo);
}

#[tokio::test]
async fn query_joint_positions_round_trip() {
    let bus = Arc::new(EventBus::new().await.unwrap());
    spawn_responder(
        Arc::clone(&bus),
        topics::QUERY_JOINTS,
        json!({ "positions": { "shoulder": 0.5 } }),
    );
    tokio::time::sleep(Duration::from_millis(20)).await;

    let client = RobotClient::new(Arc::clone(&bus));
    let positions = client.query_joint_positions().await.unwrap();
    assert_eq!(positions.get("shoulder"), Some(&0.5));
}

#[tokio::test]
async fn query_times_out_without_responder() {
    let bus = Arc::new(EventBus::new().await.unwrap());
    let client =
        RobotClient::new(Arc::clone(&bus)).with_query_timeout(Duration::from_millis(100));

    match client.query_safety().await {
        Err(GantryError::QueryTimeout(topic)) => assert_eq!(topic, topics::QUERY_SAFETY),
        other => panic!("expected QueryTimeout, got {other:?}"),
    }
}
