//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `dashboard.toml`.
//!     loads configuration from file or falls back to defaults.
//!
//! structure:
//!     - BackendConfig: Where the sensor backend lives and its two endpoints.
//!     - PollingConfig: How often the dashboard refreshes.
//!     - ChartConfig: Surface size, margin and history window.
//!     - LogConfig: How many operator log lines stay visible.
//!     - AlertConfig: Spoken alert threshold and speech program.
//!     - ServerConfig: Where the rendered view is served.
//!
//! ==============================================================================

use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct DashboardConfig {
    pub backend: BackendConfig,
    pub polling: PollingConfig,
    pub chart: ChartConfig,
    pub log: LogConfig,
    pub alert: AlertConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub latest_path: String,
    pub history_path: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            latest_path: "/api/latest".to_string(),
            history_path: "/api/history".to_string(),
        }
    }
}

impl BackendConfig {
    pub fn latest_url(&self) -> String {
        join_url(&self.base_url, &self.latest_path)
    }

    pub fn history_url(&self) -> String {
        join_url(&self.base_url, &self.history_path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self { interval_ms: 5000 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChartConfig {
    pub width: u32,
    pub height: u32,
    pub margin: f64,
    /// most recent samples plotted per series
    pub window: usize,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self { width: 800, height: 300, margin: 40.0, window: 50 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LogConfig {
    pub capacity: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { capacity: crate::log_sink::DEFAULT_CAPACITY }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AlertConfig {
    pub enabled: bool,
    /// spoken alert fires when the rounded percent reaches this
    pub threshold_percent: i64,
    /// text-to-speech program, invoked as `<command> -v <lang> <text>`
    pub command: String,
    pub lang: String,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold_percent: 60,
            command: "espeak-ng".to_string(),
            lang: "en-US".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: "0.0.0.0:3000".to_string() }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

impl DashboardConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: DashboardConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config: {}", e))?;

        Ok(config)
    }

    /// Load with default fallback
    ///
    /// an explicit path is tried first, then `config/dashboard.toml` and
    /// `../config/dashboard.toml`.
    pub fn load_or_default(explicit: Option<&Path>) -> Self {
        let mut paths = Vec::new();
        if let Some(p) = explicit {
            paths.push(p.to_path_buf());
        }
        paths.push(std::path::PathBuf::from("config").join("dashboard.toml"));
        paths.push(std::path::PathBuf::from("..").join("config").join("dashboard.toml"));

        for path in &paths {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        info!("[CONFIG] Loaded from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        warn!("[CONFIG] Failed to load {}: {}", path.display(), e);
                    }
                }
            } else if explicit == Some(path.as_path()) {
                warn!("[CONFIG] {} does not exist", path.display());
            }
        }

        warn!("[CONFIG] No config file found - using defaults");
        Self::default()
    }

    /// Log configuration summary
    pub fn print_summary(&self) {
        info!("[CONFIG] Backend: {}", self.backend.base_url);
        info!("[CONFIG] Poll Interval: {}ms", self.polling.interval_ms);
        info!(
            "[CONFIG] Chart: {}x{} (last {} samples)",
            self.chart.width, self.chart.height, self.chart.window
        );
        info!(
            "[CONFIG] Alert: {} at >= {}% via {}",
            if self.alert.enabled { "on" } else { "off" },
            self.alert.threshold_percent,
            self.alert.command
        );
        info!("[CONFIG] View: http://{}", self.server.bind);
    }
}
