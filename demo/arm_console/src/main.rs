mod config;
mod sim;

use config::ArmConsoleConfig;
use gantry_core::dashboard::{spawn_bus_mirror, DashboardConfig, DashboardServer, EventBroadcaster};
use gantry_core::sync::spawn_telemetry_pump;
use gantry_core::{Gantry, PoseSync, RobotClient, RobotScene};
use sim::SimRuntime;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    gantry_core::telemetry::init_tracing("info,gantry_core=info,arm_console=info");

    info!(target: "arm_console", "Starting arm console demo: sim runtime -> bus -> scene -> dashboard");

    // Initialize Gantry runtime essentials (event bus, event log)
    let mut gantry = Gantry::new().await?;
    gantry.start().await?;

    let bus = Arc::clone(&gantry.event_bus);
    let cfg = ArmConsoleConfig::load();

    // 1) Simulated robot runtime on the bus
    let runtime = SimRuntime::new(Arc::clone(&bus), cfg.telemetry_period_ms);
    let _runtime_handles = runtime.start().await;

    // 2) Fetch topology + initial pose the way a real dashboard would
    let client = RobotClient::new(Arc::clone(&bus));
    let topology = Arc::new(client.query_topology().await?);
    let initial: HashMap<String, f64> = client.query_joint_positions().await?;

    // 3) Scene + pose sync loop (single consumer owns the scene)
    let scene = RobotScene::build(&topology, &initial)?;
    info!(
        target: "arm_console",
        joints = scene.joint_names().len(),
        root = %scene.root_link(),
        "Scene built"
    );
    let (pose_sync, pose_tx, joints_rx) = PoseSync::new(scene, Arc::clone(&bus));
    let _sync_handle = pose_sync.spawn();
    let _pump_handle = spawn_telemetry_pump(Arc::clone(&bus), pose_tx.clone());

    // 4) Dashboard: SSE stream + REST API
    let broadcaster = EventBroadcaster::default();
    let _mirror_handles = spawn_bus_mirror(
        Arc::clone(&bus),
        broadcaster.clone(),
        gantry.event_log.clone(),
    );

    if DashboardConfig::enabled() {
        let dash_cfg = DashboardConfig {
            host: cfg.host.clone(),
            port: cfg.port,
        };
        let server = DashboardServer::new(
            dash_cfg,
            broadcaster,
            client.clone(),
            pose_tx,
            joints_rx,
            topology,
            gantry.event_log.clone(),
        );
        tokio::spawn(async move {
            if let Err(e) = server.serve().await {
                error!(target: "arm_console", error = %e, "Dashboard server failed");
            }
        });
        info!(
            target: "arm_console",
            url = %format!("http://{}:{}", cfg.host, cfg.port),
            "Dashboard ready; Ctrl-C to stop"
        );
    }
    signal::ctrl_c().await?;

    gantry.shutdown().await?;
    Ok(())
}
