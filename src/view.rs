//! ==============================================================================
//! view.rs - dashboard page and state api
//! ==============================================================================
//!
//! purpose:
//!     renders the dashboard state as a single html page (fields, risk,
//!     chart, operator log) and serves it next to a json view of the same
//!     state. rendering is a pure function of DashboardState.
//!
//! routes:
//!     GET /           -> html dashboard, re-requested every polling period
//!     GET /api/state  -> DashboardState as json
//!
//! relationships:
//!     - used by: main.rs (spawned next to the scheduler)
//!     - reads: dashboard.rs (SharedState)
//!
//! ==============================================================================

use crate::dashboard::{DashboardState, SharedState};

use anyhow::{Context, Result};
use axum::{
    extract::State,
    response::{Html, Json},
    routing::get,
    Router,
};
use std::fmt::Write as _;
use tower_http::cors::CorsLayer;
use tracing::info;

#[derive(Clone)]
struct ViewState {
    state: SharedState,
    refresh_secs: u64,
}

pub fn router(state: SharedState, refresh_secs: u64) -> Router {
    Router::new()
        .route("/", get(dashboard_handler))
        .route("/api/state", get(state_handler))
        .layer(CorsLayer::permissive())
        .with_state(ViewState { state, refresh_secs })
}

pub async fn run_server(bind: &str, state: SharedState, refresh_secs: u64) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind view server on {}", bind))?;
    info!("[SERVER] Dashboard live at http://{}", bind);
    axum::serve(listener, router(state, refresh_secs)).await?;
    Ok(())
}

async fn dashboard_handler(State(view): State<ViewState>) -> Html<String> {
    let state = view.state.read().await;
    Html(render_page(&state, view.refresh_secs))
}

/// json api endpoint for programmatic access
async fn state_handler(State(view): State<ViewState>) -> Json<DashboardState> {
    let state = view.state.read().await;
    Json(state.clone())
}

// ==============================================================================
// rendering
// ==============================================================================

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 2rem; background: #f8f9fa; color: #212529; }
.cards { display: flex; gap: 1rem; flex-wrap: wrap; }
.card { background: #fff; border-radius: 8px; padding: 1rem 1.5rem; min-width: 8rem; box-shadow: 0 1px 3px rgba(0,0,0,.1); }
.card .value { font-size: 2rem; font-weight: 600; }
.risk-low { color: #2b8a3e; } .risk-medium { color: #e67700; } .risk-high { color: #c92a2a; } .risk-unknown { color: #868e96; }
.legend span { margin-right: 1rem; }
#logEntries p { margin: .2rem 0; font-family: monospace; }
"#;

pub fn render_page(state: &DashboardState, refresh_secs: u64) -> String {
    let f = &state.fields;
    let mut page = String::new();

    let _ = write!(
        page,
        r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<meta http-equiv="refresh" content="{refresh}">
<title>Spoilage Monitor</title>
<style>{style}</style>
</head>
<body>
<h1>Spoilage Monitor</h1>
<div class="cards">
  <div class="card"><div>Temperature (°C)</div><div class="value" id="temp">{temp}</div></div>
  <div class="card"><div>Humidity (%)</div><div class="value" id="hum">{hum}</div></div>
  <div class="card"><div>Gas</div><div class="value" id="gas">{gas}</div></div>
  <div class="card"><div>Risk</div><div class="value {risk_class}" id="risk">{risk}</div>
    <div id="risk_percent">{prob}</div></div>
</div>
"#,
        refresh = refresh_secs.max(1),
        style = STYLE,
        temp = html_escape(&f.temperature),
        hum = html_escape(&f.humidity),
        gas = html_escape(&f.gas),
        risk_class = f.risk_level.css_class(),
        risk = html_escape(&f.risk),
        prob = html_escape(&f.probability_text),
    );

    if let Some(ts) = &f.reading_timestamp {
        let _ = writeln!(page, r#"<p id="reading_time">Reading taken {}</p>"#, html_escape(ts));
    }
    if let Some(at) = &state.last_update {
        let _ = writeln!(page, r#"<p id="last_update">Updated {}</p>"#, at.format("%H:%M:%S"));
    }

    page.push_str("<h2>Trend</h2>\n<div id=\"chart\">");
    match &state.chart {
        // svg is produced by chart.rs, text inside it is already escaped
        Some(frame) => page.push_str(&frame.svg),
        None => page.push_str("<p>No history yet.</p>"),
    }
    page.push_str("</div>\n<div class=\"legend\">");
    for style in [
        crate::chart::TEMPERATURE_STYLE,
        crate::chart::HUMIDITY_STYLE,
        crate::chart::GAS_STYLE,
    ] {
        let _ = write!(page, r#"<span style="color: {}">&#9632; {}</span>"#, style.color, style.label);
    }
    page.push_str("</div>\n<h2>Log</h2>\n<div id=\"logEntries\">\n");
    for entry in state.log.entries() {
        let _ = writeln!(page, "<p>{}</p>", html_escape(&entry.line()));
    }
    page.push_str("</div>\n</body>\n</html>\n");
    page
}

/// escape html special characters to prevent xss
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
