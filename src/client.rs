//! ==============================================================================
//! client.rs - telemetry client for the sensor backend
//! ==============================================================================
//!
//! purpose:
//!     issues the two polling requests (latest reading, bounded history) and
//!     decodes their json envelopes. failures come back as TelemetryError so
//!     the caller can turn them into operator log lines.
//!
//! relationships:
//!     - used by: dashboard.rs (refresh_latest, refresh_chart)
//!     - used by: scheduler.rs (shared across ticks behind an Arc)
//!     - reads: config.rs (BackendConfig urls)
//!     - decodes: domain.rs (Envelope, Reading)
//!
//! note on http status:
//!     the backend answers failures with a real envelope and a 4xx/5xx code,
//!     e.g. `500 {"status":"error","message":"..."}`. the body is decoded
//!     regardless of status; only a non-envelope body on a failed status is
//!     reported as a Status error.
//!
//! ==============================================================================

use crate::config::BackendConfig;
use crate::domain::{Envelope, Reading};

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::future::Future;

/// longest slice of a non-envelope error body kept in the message
const DETAIL_LIMIT: usize = 120;

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {status}: {detail}")]
    Status { status: StatusCode, detail: String },
    #[error("{0}")]
    Decode(#[from] serde_json::Error),
}

pub type LatestEnvelope = Envelope<Reading>;
pub type HistoryEnvelope = Envelope<Vec<Reading>>;

/// anything that can answer the two polling requests
pub trait TelemetrySource: Send + Sync + 'static {
    fn latest(&self) -> impl Future<Output = Result<LatestEnvelope, TelemetryError>> + Send;
    fn history(&self) -> impl Future<Output = Result<HistoryEnvelope, TelemetryError>> + Send;
}

/// reqwest-backed source talking to the real backend
#[derive(Clone)]
pub struct HttpTelemetry {
    http: reqwest::Client,
    latest_url: String,
    history_url: String,
}

impl HttpTelemetry {
    pub fn new(backend: &BackendConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            latest_url: backend.latest_url(),
            history_url: backend.history_url(),
        }
    }

    async fn get_envelope<T: DeserializeOwned>(&self, url: &str) -> Result<Envelope<T>, TelemetryError> {
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;

        match serde_json::from_slice::<Envelope<T>>(&body) {
            Ok(envelope) => Ok(envelope),
            Err(e) if status.is_success() => Err(TelemetryError::Decode(e)),
            Err(_) => Err(TelemetryError::Status {
                status,
                detail: String::from_utf8_lossy(&body).chars().take(DETAIL_LIMIT).collect(),
            }),
        }
    }
}

impl TelemetrySource for HttpTelemetry {
    async fn latest(&self) -> Result<LatestEnvelope, TelemetryError> {
        self.get_envelope(&self.latest_url).await
    }

    async fn history(&self) -> Result<HistoryEnvelope, TelemetryError> {
        self.get_envelope(&self.history_url).await
    }
}
