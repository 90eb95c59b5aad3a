//! Demo configuration: defaults + env + optional TOML overlay.

use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArmConsoleConfig {
    /// Dashboard bind host
    pub host: String,
    /// Dashboard bind port
    pub port: u16,
    /// Telemetry publish period in milliseconds
    pub telemetry_period_ms: u64,
}

impl Default for ArmConsoleConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3030,
            telemetry_period_ms: 100,
        }
    }
}

impl ArmConsoleConfig {
    /// Defaults, overridden by an optional TOML file (`GANTRY_DEMO_CONFIG`),
    /// overridden by individual env vars.
    pub fn load() -> Self {
        let mut cfg = Self::default();

        if let Ok(path) = std::env::var("GANTRY_DEMO_CONFIG") {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<ArmConsoleConfig>(&text) {
                    Ok(file_cfg) => cfg = file_cfg,
                    Err(e) => warn!(target: "arm_console", error = %e, "Invalid config file"),
                },
                Err(e) => warn!(target: "arm_console", path = %path, error = %e, "Cannot read config file"),
            }
        }

        if let Ok(host) = std::env::var("GANTRY_DASHBOARD_HOST") {
            cfg.host = host;
        }
        if let Some(port) = std::env::var("GANTRY_DASHBOARD_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
        {
            cfg.port = port;
        }

        cfg
    }
}
