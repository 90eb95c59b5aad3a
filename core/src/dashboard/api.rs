// Dashboard HTTP API server
//
// Provides REST endpoints and SSE streaming for the Dashboard UI

use crate::dashboard::event_stream::EventBroadcaster;
use crate::dashboard::DashboardConfig;
use crate::robot::{ParamScope, RobotClient};
use crate::sync::PoseSender;
use crate::telemetry::EventLog;
use crate::topology::Topology;
use crate::GantryError;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive},
        Html, IntoResponse, Sse,
    },
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Dashboard server state
#[derive(Clone)]
struct DashboardState {
    broadcaster: EventBroadcaster,
    client: RobotClient,
    pose: PoseSender,
    joints_rx: watch::Receiver<HashMap<String, f64>>,
    topology: Arc<Topology>,
    event_log: EventLog,
}

/// Dashboard HTTP server
pub struct DashboardServer {
    config: DashboardConfig,
    state: DashboardState,
}

impl DashboardServer {
    pub fn new(
        config: DashboardConfig,
        broadcaster: EventBroadcaster,
        client: RobotClient,
        pose: PoseSender,
        joints_rx: watch::Receiver<HashMap<String, f64>>,
        topology: Arc<Topology>,
        event_log: EventLog,
    ) -> Self {
        Self {
            config,
            state: DashboardState {
                broadcaster,
                client,
                pose,
                joints_rx,
                topology,
                event_log,
            },
        }
    }

    /// Start the Dashboard server
    pub async fn serve(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        info!(
            target: "dashboard",
            addr = %addr,
            "Starting Dashboard server"
        );

        let app = router(self.state);

        // Start server
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!(
            target: "dashboard",
            url = %format!("http://{}", addr),
            "Dashboard server ready"
        );

        axum::serve(listener, app).await?;

        Ok(())
    }
}

fn router(state: DashboardState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/static/*asset", get(static_asset_handler))
        .route("/api/events/stream", get(event_stream_handler))
        .route("/api/events/recent", get(events_recent_handler))
        .route("/api/topology", get(topology_handler))
        .route("/api/joints", get(joints_handler))
        .route("/api/safety", get(safety_handler))
        .route("/api/commands", get(commands_handler))
        .route("/api/params", get(params_handler))
        .route("/api/command", post(command_handler))
        .route("/api/target", post(target_handler))
        .route("/api/param", post(param_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Serve the main HTML page
const FALLBACK_INDEX: &str = r#"<!DOCTYPE html><html><head><meta charset="utf-8"><title>Gantry Dashboard</title></head><body><h1>Gantry Dashboard assets not found</h1></body></html>"#;

async fn index_handler() -> Html<&'static str> {
    let html = crate::dashboard::static_assets::get_text("index.html").unwrap_or(FALLBACK_INDEX);
    Html(html)
}

async fn static_asset_handler(Path(asset): Path<String>) -> impl IntoResponse {
    match crate::dashboard::static_assets::get(asset.as_str()) {
        Some(asset) => {
            let mut headers = HeaderMap::new();
            if let Ok(value) = header::HeaderValue::from_str(asset.content_type) {
                headers.insert(header::CONTENT_TYPE, value);
            }
            (StatusCode::OK, headers, asset.body).into_response()
        }
        None => {
            let headers = HeaderMap::new();
            (StatusCode::NOT_FOUND, headers, b"Not found".as_slice()).into_response()
        }
    }
}

/// SSE endpoint for real-time events
async fn event_stream_handler(
    State(state): State<DashboardState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    info!(target: "dashboard", "New SSE client connected");

    let rx = state.broadcaster.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) => {
            // Convert DashboardEvent to SSE Event
            match serde_json::to_string(&event) {
                Ok(json) => Some(Ok(Event::default().data(json))),
                Err(e) => {
                    warn!(target: "dashboard", error = %e, "Failed to serialize event");
                    None
                }
            }
        }
        Err(e) => {
            warn!(target: "dashboard", error = %e, "Broadcast error");
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Query parameters for events/recent endpoint
#[derive(Deserialize)]
struct RecentQuery {
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    100
}

/// Get recent bus events. Query params: ?limit=100 (default: 100, max: 1000)
async fn events_recent_handler(
    State(state): State<DashboardState>,
    Query(query): Query<RecentQuery>,
) -> impl IntoResponse {
    let limit = query.limit.min(1000); // Cap at 1000
    Json(state.event_log.get_recent(limit).await)
}

/// Get the robot topology snapshot
async fn topology_handler(State(state): State<DashboardState>) -> impl IntoResponse {
    Json(state.topology.as_ref().clone())
}

/// Get the latest full joint mapping
async fn joints_handler(State(state): State<DashboardState>) -> impl IntoResponse {
    let joints = state.joints_rx.borrow().clone();
    Json(joints)
}

/// Query the runtime's safety state
async fn safety_handler(
    State(state): State<DashboardState>,
) -> Result<impl IntoResponse, StatusCode> {
    match state.client.query_safety().await {
        Ok(safety) => Ok(Json(safety)),
        Err(e) => Err(error_status(&e)),
    }
}

/// Query the runtime's command catalog
async fn commands_handler(
    State(state): State<DashboardState>,
) -> Result<impl IntoResponse, StatusCode> {
    match state.client.query_commands().await {
        Ok(commands) => Ok(Json(commands)),
        Err(e) => Err(error_status(&e)),
    }
}

/// Query the runtime's parameter catalog
async fn params_handler(
    State(state): State<DashboardState>,
) -> Result<impl IntoResponse, StatusCode> {
    match state.client.query_parameters().await {
        Ok(params) => Ok(Json(params)),
        Err(e) => Err(error_status(&e)),
    }
}

#[derive(Deserialize)]
struct CommandBody {
    name: String,
    #[serde(default)]
    args: HashMap<String, String>,
}

/// Request execution of a named command
async fn command_handler(
    State(state): State<DashboardState>,
    Json(body): Json<CommandBody>,
) -> Result<StatusCode, StatusCode> {
    state
        .client
        .execute(&body.name, body.args)
        .await
        .map_err(|e| error_status(&e))?;
    Ok(StatusCode::ACCEPTED)
}

#[derive(Deserialize)]
struct TargetBody {
    joint: String,
    value: f64,
}

/// Set a joint target: apply a speculative local edit to the scene for
/// immediate feedback and independently publish the actuator command.
/// Neither write waits for acknowledgement.
async fn target_handler(
    State(state): State<DashboardState>,
    Json(body): Json<TargetBody>,
) -> Result<StatusCode, StatusCode> {
    let mut positions = HashMap::new();
    positions.insert(body.joint.clone(), body.value);
    state.pose.local(positions).await;

    state
        .client
        .set_joint_target(&body.joint, body.value)
        .await
        .map_err(|e| error_status(&e))?;
    Ok(StatusCode::ACCEPTED)
}

#[derive(Deserialize)]
struct ParamBody {
    name: String,
    value: serde_json::Value,
    #[serde(default = "default_scope")]
    scope: ParamScope,
}

fn default_scope() -> ParamScope {
    ParamScope::Local
}

/// Write a parameter value
async fn param_handler(
    State(state): State<DashboardState>,
    Json(body): Json<ParamBody>,
) -> Result<StatusCode, StatusCode> {
    state
        .client
        .set_parameter(&body.name, body.value, body.scope)
        .await
        .map_err(|e| error_status(&e))?;
    Ok(StatusCode::ACCEPTED)
}

fn error_status(err: &GantryError) -> StatusCode {
    match err {
        GantryError::QueryTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::EventBus;
    use crate::scene::RobotScene;
    use crate::sync::PoseSync;
    use crate::topology::{Link, Topology};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn test_router() -> Router {
        let bus = Arc::new(EventBus::new().await.unwrap());
        let mut topo = Topology::new();
        topo.add_link(Link::new("base"));
        let scene = RobotScene::build(&topo, &HashMap::new()).unwrap();
        let (_sync, pose, joints_rx) = PoseSync::new(scene, Arc::clone(&bus));
        router(DashboardState {
            broadcaster: EventBroadcaster::default(),
            client: RobotClient::new(bus),
            pose,
            joints_rx,
            topology: Arc::new(topo),
            event_log: EventLog::new(16),
        })
    }

    #[tokio::test]
    async fn topology_snapshot_is_served_as_json() {
        let app = test_router().await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/topology")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    }

    #[tokio::test]
    async fn recent_events_are_served_as_json() {
        let app = test_router().await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/events/recent?limit=5")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    }
}
