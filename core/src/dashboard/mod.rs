// Dashboard module - Robot control and telemetry visualisation
//
// Provides a simple HTTP server with SSE for streaming robot events to a web UI.

mod api;
mod event_stream;
mod static_assets;

pub use api::DashboardServer;
pub use event_stream::{spawn_bus_mirror, DashboardEvent, DashboardEventType, EventBroadcaster};

/// Dashboard configuration
#[derive(Clone, Debug)]
pub struct DashboardConfig {
    pub port: u16,
    pub host: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            port: 3030,
            host: "127.0.0.1".to_string(),
        }
    }
}

impl DashboardConfig {
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("GANTRY_DASHBOARD_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3030),
            host: std::env::var("GANTRY_DASHBOARD_HOST")
                .unwrap_or_else(|_| "127.0.0.1".to_string()),
        }
    }

    pub fn enabled() -> bool {
        std::env::var("GANTRY_DASHBOARD")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(true)
    }
}
