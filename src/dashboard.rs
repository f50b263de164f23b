//! ==============================================================================
//! dashboard.rs - dashboard state and the two refresh paths
//! ==============================================================================
//!
//! purpose:
//!     holds everything the view shows (display fields, operator log, last
//!     chart frame) in one explicit state value, and implements the two
//!     per-tick refresh paths that update it:
//!
//!     refresh_latest: fetch -> update fields -> append log -> maybe alert
//!     refresh_chart:  fetch history -> redraw chart (errors to the log)
//!
//!     each path is a pure transformation of the fetch result applied under
//!     one short write lock. neither path returns an error: every failure
//!     ends up as a log line and the next tick simply tries again.
//!
//! relationships:
//!     - used by: scheduler.rs (spawns both paths every tick)
//!     - used by: view.rs (reads the shared state)
//!     - uses: client.rs, chart.rs, log_sink.rs, speech.rs
//!
//! ==============================================================================

use crate::chart::{self, ChartFrame};
use crate::client::{HistoryEnvelope, LatestEnvelope, TelemetryError, TelemetrySource};
use crate::config::{AlertConfig, ChartConfig, DashboardConfig};
use crate::domain::{DisplayFields, Reading};
use crate::log_sink::LogSink;
use crate::speech::AlertNotifier;

use chrono::{DateTime, Local};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

// ==============================================================================
// shared state
// ==============================================================================
// written by the refresh tasks, read by the view server.
// arc<rwlock<>>: many readers OR one writer.

#[derive(Clone, Debug, Serialize)]
pub struct DashboardState {
    pub fields: DisplayFields,
    pub log: LogSink,
    pub chart: Option<ChartFrame>,
    /// local time of the last successful latest-reading update
    pub last_update: Option<DateTime<Local>>,
}

pub type SharedState = Arc<RwLock<DashboardState>>;

impl Default for DashboardState {
    fn default() -> Self {
        Self::new(crate::log_sink::DEFAULT_CAPACITY)
    }
}

/// result of one latest-reading fetch, reduced to what the state needs
#[derive(Debug)]
pub enum LatestOutcome {
    Reading(Reading),
    NoData,
    Failed(String),
}

impl From<Result<LatestEnvelope, TelemetryError>> for LatestOutcome {
    fn from(result: Result<LatestEnvelope, TelemetryError>) -> Self {
        match result {
            Ok(envelope) => {
                let detail = envelope.message.clone();
                match envelope.into_success() {
                    Some(reading) => LatestOutcome::Reading(reading),
                    None => {
                        if let Some(detail) = detail {
                            debug!("[LATEST] Backend reported: {}", detail);
                        }
                        LatestOutcome::NoData
                    }
                }
            }
            Err(e) => LatestOutcome::Failed(e.to_string()),
        }
    }
}

/// result of one history fetch
#[derive(Debug)]
pub enum HistoryOutcome {
    Frame(ChartFrame),
    Skipped,
    Failed(String),
}

impl HistoryOutcome {
    /// render the frame outside of any lock
    pub fn render(result: Result<HistoryEnvelope, TelemetryError>, config: &ChartConfig) -> Self {
        match result {
            Ok(envelope) => match envelope.into_success() {
                Some(history) => HistoryOutcome::Frame(chart::render_svg(&history, config)),
                None => HistoryOutcome::Skipped,
            },
            Err(e) => HistoryOutcome::Failed(e.to_string()),
        }
    }
}

impl DashboardState {
    pub fn new(log_capacity: usize) -> Self {
        Self {
            fields: DisplayFields::default(),
            log: LogSink::with_capacity(log_capacity),
            chart: None,
            last_update: None,
        }
    }

    /// fields first, then the log line. returns the rounded percent when a
    /// reading was applied so the caller can decide on an alert.
    pub fn apply_latest(&mut self, outcome: LatestOutcome) -> Option<i64> {
        match outcome {
            LatestOutcome::Reading(reading) => {
                let fields = DisplayFields::from_reading(&reading);
                let percent = fields.percent;
                let summary = format!(
                    "Latest: T={}°C H={}% G={} → {} ({}%)",
                    reading.temperature, reading.humidity, reading.gas, fields.risk, percent
                );
                self.fields = fields;
                self.last_update = Some(Local::now());
                self.log.append(summary);
                Some(percent)
            }
            LatestOutcome::NoData => {
                self.log.append("No data yet.");
                None
            }
            LatestOutcome::Failed(message) => {
                self.log.append(format!("Error fetching latest: {}", message));
                None
            }
        }
    }

    pub fn apply_history(&mut self, outcome: HistoryOutcome) {
        match outcome {
            HistoryOutcome::Frame(frame) => self.chart = Some(frame),
            HistoryOutcome::Skipped => {}
            HistoryOutcome::Failed(message) => {
                self.log.append(format!("Error drawing chart: {}", message));
            }
        }
    }
}

// ==============================================================================
// refresh paths
// ==============================================================================

/// everything one tick needs; cheap to clone into spawned tasks
pub struct Dashboard<S> {
    source: Arc<S>,
    state: SharedState,
    notifier: AlertNotifier,
    alert: AlertConfig,
    chart: ChartConfig,
}

impl<S> Clone for Dashboard<S> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            state: self.state.clone(),
            notifier: self.notifier.clone(),
            alert: self.alert.clone(),
            chart: self.chart.clone(),
        }
    }
}

impl<S: TelemetrySource> Dashboard<S> {
    pub fn new(source: Arc<S>, state: SharedState, notifier: AlertNotifier, config: &DashboardConfig) -> Self {
        Self {
            source,
            state,
            notifier,
            alert: config.alert.clone(),
            chart: config.chart.clone(),
        }
    }

    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    /// fetch the latest reading, update the view, alert on high risk
    pub async fn refresh_latest(&self) {
        let outcome = LatestOutcome::from(self.source.latest().await);
        if let LatestOutcome::Failed(ref e) = outcome {
            warn!("[LATEST] Fetch failed: {}", e);
        }

        let percent = {
            let mut state = self.state.write().await;
            state.apply_latest(outcome)
        };

        if let Some(percent) = percent {
            debug!("[LATEST] Spoilage probability {}%", percent);
            if self.alert.enabled && percent >= self.alert.threshold_percent {
                info!("[LATEST] Risk at {}% - speaking alert", percent);
                self.notifier.speak_alert(&AlertNotifier::alert_text(percent));
            }
        }
    }

    /// fetch history and redraw the chart from scratch
    pub async fn refresh_chart(&self) {
        let outcome = HistoryOutcome::render(self.source.history().await, &self.chart);
        match &outcome {
            HistoryOutcome::Frame(frame) => debug!("[CHART] Redrawn with {} samples", frame.samples),
            HistoryOutcome::Skipped => debug!("[CHART] History not available, skipping draw"),
            HistoryOutcome::Failed(e) => warn!("[CHART] History fetch failed: {}", e),
        }
        self.state.write().await.apply_history(outcome);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::speech::tests::FakeSpeech;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// scripted backend: each call pops (delay_ms, json body)
    #[derive(Default)]
    pub(crate) struct FakeSource {
        pub latest: Mutex<VecDeque<(u64, String)>>,
        pub history: Mutex<VecDeque<(u64, String)>>,
    }

    impl FakeSource {
        pub fn push_latest(&self, delay_ms: u64, body: impl Into<String>) {
            self.latest.lock().unwrap().push_back((delay_ms, body.into()));
        }

        pub fn push_history(&self, delay_ms: u64, body: impl Into<String>) {
            self.history.lock().unwrap().push_back((delay_ms, body.into()));
        }
    }

    async fn answer<T: serde::de::DeserializeOwned>(reply: Option<(u64, String)>) -> Result<T, TelemetryError> {
        let (delay, body) = reply.unwrap_or((0, r#"{"status":"empty"}"#.to_string()));
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        Ok(serde_json::from_str(&body)?)
    }

    impl TelemetrySource for FakeSource {
        async fn latest(&self) -> Result<LatestEnvelope, TelemetryError> {
            let reply = self.latest.lock().unwrap().pop_front();
            answer(reply).await
        }

        async fn history(&self) -> Result<HistoryEnvelope, TelemetryError> {
            let reply = self.history.lock().unwrap().pop_front();
            answer(reply).await
        }
    }

    const HIGH_RISK: &str = r#"{"status":"success","data":{"temperature":21.37,"humidity":55.2,"gas":310,
        "prediction":{"risk":"high","probability":0.72,"method":"rule-based"}}}"#;

    fn reading_body(temperature: f64, probability: f64) -> String {
        format!(
            r#"{{"status":"success","data":{{"temperature":{},"humidity":50,"gas":200,
                "prediction":{{"risk":"Medium","probability":{},"method":"rule"}}}}}}"#,
            temperature, probability
        )
    }

    fn dashboard() -> (Dashboard<FakeSource>, Arc<FakeSource>, Arc<FakeSpeech>) {
        let source = Arc::new(FakeSource::default());
        let speech = Arc::new(FakeSpeech::default());
        let state = Arc::new(RwLock::new(DashboardState::default()));
        let notifier = AlertNotifier::new(speech.clone(), "en-US");
        let dash = Dashboard::new(source.clone(), state, notifier, &DashboardConfig::default());
        (dash, source, speech)
    }

    async fn messages(dash: &Dashboard<FakeSource>) -> Vec<String> {
        dash.state().read().await.log.entries().map(|e| e.message.clone()).collect()
    }

    #[tokio::test]
    async fn high_risk_reading_updates_logs_and_alerts() {
        let (dash, source, speech) = dashboard();
        source.push_latest(0, HIGH_RISK);
        dash.refresh_latest().await;

        let state = dash.state();
        let state = state.read().await;
        assert_eq!(state.fields.temperature, "21.4");
        assert_eq!(state.fields.humidity, "55.2");
        assert_eq!(state.fields.gas, "310");
        assert_eq!(state.fields.risk, "high");
        assert_eq!(state.fields.probability_text, "Spoilage Probability: 72% (method: rule-based)");
        assert!(state.last_update.is_some());
        assert_eq!(state.log.len(), 1);
        assert_eq!(
            state.log.newest().unwrap().message,
            "Latest: T=21.37°C H=55.2% G=310 → high (72%)"
        );
        assert_eq!(
            speech.spoken(),
            vec!["Warning: Spoilage probability is 72 percent. Take corrective action."]
        );
    }

    #[tokio::test]
    async fn unsuccessful_envelope_logs_no_data() {
        let (dash, source, speech) = dashboard();
        source.push_latest(0, r#"{"status":"error"}"#);
        dash.refresh_latest().await;

        assert_eq!(messages(&dash).await, vec!["No data yet."]);
        assert_eq!(dash.state().read().await.fields, DisplayFields::default());
        assert!(speech.calls().is_empty());
    }

    #[tokio::test]
    async fn malformed_latest_is_logged_and_keeps_fields() {
        let (dash, source, speech) = dashboard();
        source.push_latest(0, HIGH_RISK);
        source.push_latest(0, "{not json");
        dash.refresh_latest().await;
        dash.refresh_latest().await;

        let log = messages(&dash).await;
        assert_eq!(log.len(), 2);
        assert!(log[0].starts_with("Error fetching latest: "));
        assert_eq!(dash.state().read().await.fields.temperature, "21.4");
        assert_eq!(speech.spoken().len(), 1);
    }

    #[tokio::test]
    async fn alert_threshold_uses_rounded_percent() {
        let (dash, source, speech) = dashboard();
        source.push_latest(0, reading_body(20.0, 0.59));
        source.push_latest(0, reading_body(20.0, 0.6));
        source.push_latest(0, reading_body(20.0, 0.596));
        dash.refresh_latest().await;
        assert!(speech.spoken().is_empty());
        dash.refresh_latest().await;
        dash.refresh_latest().await;
        assert_eq!(speech.spoken().len(), 2);
        assert!(speech.spoken()[1].contains(" 60 percent"));
    }

    #[tokio::test]
    async fn missing_prediction_never_alerts() {
        let (dash, source, speech) = dashboard();
        source.push_latest(0, r#"{"status":"success","data":{"temperature":30,"humidity":90,"gas":900}}"#);
        dash.refresh_latest().await;
        let state = dash.state();
        let state = state.read().await;
        assert_eq!(state.fields.risk, "--");
        assert_eq!(state.log.newest().unwrap().message, "Latest: T=30°C H=90% G=900 → -- (0%)");
        assert!(speech.calls().is_empty());
    }

    #[tokio::test]
    async fn history_success_stores_frame() {
        let (dash, source, _) = dashboard();
        let row = r#"{"temperature":4,"humidity":4,"gas":4}"#;
        source.push_history(0, format!(r#"{{"status":"success","data":[{row},{row},{row}]}}"#));
        dash.refresh_chart().await;

        let state = dash.state();
        let state = state.read().await;
        let frame = state.chart.as_ref().unwrap();
        assert_eq!(frame.samples, 3);
        assert_eq!(frame.svg.matches("<polyline").count(), 3);
        assert!(state.log.is_empty());
    }

    #[tokio::test]
    async fn history_without_success_is_silent() {
        let (dash, source, _) = dashboard();
        source.push_history(0, r#"{"status":"error","message":"no csv"}"#);
        dash.refresh_chart().await;
        let state = dash.state();
        let state = state.read().await;
        assert!(state.chart.is_none());
        assert!(state.log.is_empty());
    }

    #[tokio::test]
    async fn history_failure_is_logged_and_keeps_previous_frame() {
        let (dash, source, _) = dashboard();
        source.push_history(0, r#"{"status":"success","data":[{"temperature":1,"humidity":2,"gas":3}]}"#);
        source.push_history(0, "garbage");
        dash.refresh_chart().await;
        dash.refresh_chart().await;

        let log = messages(&dash).await;
        assert_eq!(log.len(), 1);
        assert!(log[0].starts_with("Error drawing chart: "));
        assert_eq!(dash.state().read().await.chart.as_ref().map(|f| f.samples), Some(1));
    }

    #[tokio::test]
    async fn overlapping_ticks_last_response_wins() {
        let (dash, source, _) = dashboard();
        // the first request resolves after the second one
        source.push_latest(80, reading_body(10.0, 0.1));
        source.push_latest(0, reading_body(20.0, 0.1));

        let first = tokio::spawn({
            let dash = dash.clone();
            async move { dash.refresh_latest().await }
        });
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = tokio::spawn({
            let dash = dash.clone();
            async move { dash.refresh_latest().await }
        });
        first.await.unwrap();
        second.await.unwrap();

        let state = dash.state();
        let state = state.read().await;
        assert_eq!(state.fields.temperature, "10.0");
        let log: Vec<_> = state.log.entries().map(|e| e.message.clone()).collect();
        assert_eq!(log.len(), 2);
        assert!(log[0].starts_with("Latest: T=10°C"));
        assert!(log[1].starts_with("Latest: T=20°C"));
    }
}
