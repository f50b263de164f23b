//! ==============================================================================
//! main.rs - spoilage dashboard entry point
//! ==============================================================================
//!
//! purpose:
//!     a live dashboard for one storage sensor node. it polls the sensor
//!     backend for the latest reading and recent history, shows the values
//!     with the backend's spoilage-risk classification, draws a trend chart
//!     and speaks a warning when the risk gets high.
//!
//! responsibilities:
//!     - load configuration and set up diagnostics
//!     - build the shared dashboard state
//!     - serve the rendered dashboard view
//!     - run the refresh scheduler until ctrl-c
//!
//! architecture:
//!
//!     ┌──────────────────────────────────────────────────────────────┐
//!     │                    dashboard (this binary)                   │
//!     │  ┌─────────────┐   ┌──────────────┐   ┌──────────────────┐   │
//!     │  │ scheduler   │──▶│ refresh paths│──▶│ dashboard state  │   │
//!     │  │ (5s ticks)  │   │ latest/chart │   │ fields/log/chart │   │
//!     │  └─────────────┘   └──────┬───────┘   └────────┬─────────┘   │
//!     │                           │                    │             │
//!     │                    ┌──────┴──────┐      ┌──────┴──────┐      │
//!     │                    │ alert       │      │ view server │      │
//!     │                    │ (tts)       │      │ (port 3000) │      │
//!     │                    └─────────────┘      └─────────────┘      │
//!     └───────────────────────────┬──────────────────────────────────┘
//!                                 │ http (json envelopes)
//!                     ┌───────────┴───────────┐
//!                     │ sensor backend        │
//!                     │ /api/latest           │
//!                     │ /api/history          │
//!                     └───────────────────────┘
//!
//! usage:
//!     spoilage-dashboard [path/to/dashboard.toml]
//!
//! ==============================================================================

mod chart;
mod client;
mod config;
mod dashboard;
mod domain;
mod log_sink;
mod scheduler;
mod speech;
mod view;

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use tracing_subscriber::{prelude::*, reload, EnvFilter};

use crate::client::HttpTelemetry;
use crate::dashboard::{Dashboard, DashboardState, SharedState};
use crate::scheduler::Scheduler;
use crate::speech::{AlertNotifier, CommandSpeech, NullSpeech, SpeechEngine};

type FilterHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

// ==============================================================================
// main entry point
// ==============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // step 1: diagnostics (level is refined once the config is known)
    let filter = init_tracing();

    info!("===========================================================");
    info!("  Spoilage Dashboard v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================================");

    // step 2: load configuration
    let explicit = std::env::args_os().nth(1).map(PathBuf::from);
    let config = config::DashboardConfig::load_or_default(explicit.as_deref());
    apply_config_level(&filter, &config.logging.level);
    config.print_summary();

    // step 3: shared state and collaborators
    let state: SharedState = Arc::new(RwLock::new(DashboardState::new(config.log.capacity)));
    let source = Arc::new(HttpTelemetry::new(&config.backend));
    let engine: Arc<dyn SpeechEngine> = if config.alert.command.trim().is_empty() {
        Arc::new(NullSpeech)
    } else {
        Arc::new(CommandSpeech::new(config.alert.command.trim()))
    };
    if config.alert.enabled && !engine.is_available() {
        warn!("[STARTUP] Speech program '{}' unavailable - alerts will only be logged", config.alert.command);
    }
    let notifier = AlertNotifier::new(engine, config.alert.lang.clone());
    let dashboard = Dashboard::new(source, state, notifier, &config);

    // step 4: start the view server in background
    let view_state = dashboard.state();
    let bind = config.server.bind.clone();
    let refresh_secs = config.polling.interval_ms.div_ceil(1000);
    tokio::spawn(async move {
        if let Err(e) = view::run_server(&bind, view_state, refresh_secs).await {
            error!("[SERVER] View server error: {:#}", e);
        }
    });

    // step 5: refresh loop, for the lifetime of the process
    info!("[STARTUP] Polling {} every {}ms", config.backend.base_url, config.polling.interval_ms);
    let scheduler = Scheduler::new(dashboard, Duration::from_millis(config.polling.interval_ms));
    tokio::select! {
        _ = scheduler.run() => {}
        res = tokio::signal::ctrl_c() => {
            res?;
            info!("[STARTUP] Shutting down");
        }
    }

    Ok(())
}

/// RUST_LOG wins; otherwise start at info until the config says otherwise
fn init_tracing() -> Option<FilterHandle> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
            None
        }
        Err(_) => {
            let (filter, handle) = reload::Layer::new(EnvFilter::new("info"));
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
            Some(handle)
        }
    }
}

fn apply_config_level(handle: &Option<FilterHandle>, level: &str) {
    let Some(handle) = handle else { return };
    match EnvFilter::try_new(level) {
        Ok(filter) => {
            if let Err(e) = handle.reload(filter) {
                warn!("[CONFIG] Could not apply log level '{}': {}", level, e);
            }
        }
        Err(e) => warn!("[CONFIG] Invalid log level '{}': {}", level, e),
    }
}
