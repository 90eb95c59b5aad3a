use std::collections::HashMap;
use std::f64::consts::FRAC_PI_2;
use std::sync::Arc;
use std::time::Duration;

use gantry_core::messaging::{topics, Event, EventBus, QosLevel};
use gantry_core::sync::spawn_telemetry_pump;
use gantry_core::topology::{Joint, JointType, Link, Topology};
use gantry_core::{PoseSync, RobotScene};
use serde_json::json;

fn arm_topology() -> Topology {
    let mut topo = Topology::new();
    topo.add_link(Link::new("base"));
    topo.add_link(Link::new("arm"));
    topo.add_joint(
        Joint::new("shoulder", JointType::Revolute, "base", "arm")
            .with_limits(-FRAC_PI_2, FRAC_PI_2),
    );
    topo
}

fn positions(value: f64) -> HashMap<String, f64> {
    let mut map = HashMap::new();
    map.insert("shoulder".to_string(), value);
    map
}

async fn wait_for(
    rx: &mut tokio::sync::watch::Receiver<HashMap<String, f64>>,
    joint: &str,
    expected: f64,
) {
    tokio::time::timeout(Duration::from_millis(500), async {
        loop {
            rx.changed().await.expect("watch closed");
            if rx.borrow().get(joint) == Some(&expected) {
                return;
            }
        }
    })
    .await
    .expect("timed out waiting for snapshot");
}

#[tokio::test]
async fn local_edit_updates_snapshot_and_rebroadcasts() {
    let bus = Arc::new(EventBus::new().await.unwrap());
    let scene = RobotScene::build(&arm_topology(), &HashMap::new()).unwrap();
    let (sync, sender, mut snapshot) = PoseSync::new(scene, Arc::clone(&bus));

    // Observe the authoritative topic for the rebroadcast
    let (_id, mut bus_rx) = bus
        .subscribe(topics::JOINT_STATES.to_string(), vec![], QosLevel::Batched)
        .await
        .unwrap();

    sync.spawn();
    sender.local(positions(0.4)).await;

    wait_for(&mut snapshot, "shoulder", 0.4).await;

    let event = tokio::time::timeout(Duration::from_millis(500), bus_rx.recv())
        .await
        .expect("timeout")
        .expect("channel closed");
    assert_eq!(event.source, "scene.local");
    assert_eq!(event.kind, "joint_state");
}

#[tokio::test]
async fn telemetry_overwrites_local_edit_last_write_wins() {
    let bus = Arc::new(EventBus::new().await.unwrap());
    let scene = RobotScene::build(&arm_topology(), &HashMap::new()).unwrap();
    let (sync, sender, mut snapshot) = PoseSync::new(scene, Arc::clone(&bus));
    sync.spawn();

    sender.local(positions(0.4)).await;
    wait_for(&mut snapshot, "shoulder", 0.4).await;

    // Authoritative telemetry for the same joint simply overwrites it
    sender.telemetry(positions(0.1)).await;
    wait_for(&mut snapshot, "shoulder", 0.1).await;
}

#[tokio::test]
async fn telemetry_is_not_rebroadcast() {
    let bus = Arc::new(EventBus::new().await.unwrap());
    let scene = RobotScene::build(&arm_topology(), &HashMap::new()).unwrap();
    let (sync, sender, mut snapshot) = PoseSync::new(scene, Arc::clone(&bus));

    let (_id, mut bus_rx) = bus
        .subscribe(topics::JOINT_STATES.to_string(), vec![], QosLevel::Batched)
        .await
        .unwrap();

    sync.spawn();
    sender.telemetry(positions(0.2)).await;
    wait_for(&mut snapshot, "shoulder", 0.2).await;

    let quiet = tokio::time::timeout(Duration::from_millis(200), bus_rx.recv()).await;
    assert!(quiet.is_err(), "telemetry must not echo back onto the bus");
}

#[tokio::test]
async fn unchanged_update_does_not_publish_snapshot() {
    let bus = Arc::new(EventBus::new().await.unwrap());
    let scene = RobotScene::build(&arm_topology(), &HashMap::new()).unwrap();
    let (sync, sender, mut snapshot) = PoseSync::new(scene, Arc::clone(&bus));
    sync.spawn();

    sender.local(positions(0.3)).await;
    wait_for(&mut snapshot, "shoulder", 0.3).await;

    // Re-sending the identical value is a no-op: no new snapshot version
    sender.local(positions(0.3)).await;
    let changed = tokio::time::timeout(Duration::from_millis(200), snapshot.changed()).await;
    assert!(changed.is_err(), "identical value must not trigger a snapshot");
}

#[tokio::test]
async fn telemetry_pump_applies_bus_events_and_skips_local_echo() {
    let bus = Arc::new(EventBus::new().await.unwrap());
    let scene = RobotScene::build(&arm_topology(), &HashMap::new()).unwrap();
    let (sync, sender, mut snapshot) = PoseSync::new(scene, Arc::clone(&bus));
    sync.spawn();
    spawn_telemetry_pump(Arc::clone(&bus), sender.clone());

    // Give the pump a moment to subscribe
    tokio::time::sleep(Duration::from_millis(50)).await;

    // A local-echo event on the same path must be skipped by the pump
    let echo = Event::new(
        "joint_state",
        json!({ "positions": { "shoulder": 1.0 } }),
        "scene.local",
    );
    bus.publish(topics::JOINT_STATES, echo).await.unwrap();

    // Authoritative telemetry is applied
    let telemetry = Event::new(
        "joint_state",
        json!({ "positions": { "shoulder": 0.25 } }),
        "runtime.sensors",
    );
    bus.publish(topics::JOINT_STATES, telemetry).await.unwrap();

    wait_for(&mut snapshot, "shoulder", 0.25).await;
    assert_eq!(snapshot.borrow().get("shoulder"), Some(&0.25));
}
