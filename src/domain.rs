//! ==============================================================================
//! domain.rs - telemetry data model
//! ==============================================================================
//!
//! purpose:
//!     the json contract consumed from the sensor backend (envelope, reading,
//!     prediction) and the text fields the dashboard shows for a reading.
//!
//! relationships:
//!     - used by: client.rs (decodes envelopes)
//!     - used by: dashboard.rs (turns readings into display fields)
//!     - used by: view.rs (renders display fields)
//!
//! ==============================================================================

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// status value the backend uses for a populated envelope
pub const STATUS_SUCCESS: &str = "success";

/// the `{status, data}` wrapper every backend response uses
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Envelope<T> {
    pub status: String,
    pub data: Option<T>,
    /// error text the backend attaches to failed envelopes
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    /// returns the payload only when the envelope is a success carrying data
    pub fn into_success(self) -> Option<T> {
        if self.status == STATUS_SUCCESS {
            self.data
        } else {
            None
        }
    }
}

/// one environmental sample as produced by the backend
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Reading {
    /// temperature in celsius
    pub temperature: f64,
    /// relative humidity (0-100%)
    pub humidity: f64,
    /// raw gas sensor value
    pub gas: f64,
    /// backend-side receipt time; devices send text or epoch seconds
    #[serde(default, deserialize_with = "lenient_text")]
    pub timestamp: Option<String>,
    /// spoilage prediction; absent in history rows
    #[serde(default)]
    pub prediction: Option<Prediction>,
}

impl Reading {
    /// prediction or the placeholder used when the backend sent none
    pub fn prediction_or_default(&self) -> Prediction {
        self.prediction.clone().unwrap_or_default()
    }
}

/// any json scalar as text; strings keep their raw value
fn lenient_text<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(de)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

fn null_as_zero<'de, D: Deserializer<'de>>(de: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(de)?.unwrap_or_default())
}

/// spoilage-risk classification attached to a reading
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Prediction {
    pub risk: String,
    #[serde(deserialize_with = "null_as_zero")]
    pub probability: f64,
    pub method: String,
}

impl Default for Prediction {
    fn default() -> Self {
        Self {
            risk: PLACEHOLDER.to_string(),
            probability: 0.0,
            method: PLACEHOLDER.to_string(),
        }
    }
}

impl Prediction {
    /// probability as a whole percent, rounded half away from zero
    pub fn percent(&self) -> i64 {
        (self.probability * 100.0).round() as i64
    }
}

/// coarse risk bucket used for view styling only
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Unknown,
}

impl RiskLevel {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" => RiskLevel::Low,
            "medium" => RiskLevel::Medium,
            "high" => RiskLevel::High,
            _ => RiskLevel::Unknown,
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            RiskLevel::Low => "risk-low",
            RiskLevel::Medium => "risk-medium",
            RiskLevel::High => "risk-high",
            RiskLevel::Unknown => "risk-unknown",
        }
    }
}

/// shown before the first successful reading and for missing predictions
pub const PLACEHOLDER: &str = "--";

/// the text fields of the dashboard, as rendered
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct DisplayFields {
    pub temperature: String,
    pub humidity: String,
    pub gas: String,
    pub risk: String,
    pub risk_level: RiskLevel,
    pub probability_text: String,
    pub percent: i64,
    pub reading_timestamp: Option<String>,
}

impl Default for DisplayFields {
    fn default() -> Self {
        Self {
            temperature: PLACEHOLDER.to_string(),
            humidity: PLACEHOLDER.to_string(),
            gas: PLACEHOLDER.to_string(),
            risk: PLACEHOLDER.to_string(),
            risk_level: RiskLevel::Unknown,
            probability_text: String::new(),
            percent: 0,
            reading_timestamp: None,
        }
    }
}

impl DisplayFields {
    pub fn from_reading(reading: &Reading) -> Self {
        let pred = reading.prediction_or_default();
        let percent = pred.percent();
        Self {
            temperature: fixed(reading.temperature, 1),
            humidity: fixed(reading.humidity, 1),
            gas: fixed(reading.gas, 0),
            risk_level: RiskLevel::from_label(&pred.risk),
            probability_text: format!(
                "Spoilage Probability: {}% (method: {})",
                percent, pred.method
            ),
            risk: pred.risk,
            percent,
            reading_timestamp: reading.timestamp.clone(),
        }
    }
}

/// fixed-decimal text of the exact binary value, exact ties rounded away
/// from zero (1.45 is stored as 1.4499.. and shows "1.4", 0.25 shows "0.3")
pub fn fixed(value: f64, decimals: usize) -> String {
    let value = if is_exact_tie(value, decimals) {
        let scale = 10f64.powi(decimals as i32);
        (value.abs() * scale).ceil() / scale * value.signum()
    } else {
        value
    };
    let text = format!("{:.*}", decimals, value);
    // avoid "-0.0" for values that round to zero
    if text.starts_with('-') && text[1..].bytes().all(|b| b == b'0' || b == b'.') {
        text[1..].to_string()
    } else {
        text
    }
}

/// digit `decimals + 1` is a 5 with nothing after it in the exact expansion
fn is_exact_tie(value: f64, decimals: usize) -> bool {
    const TAIL: usize = 30;
    if !value.is_finite() {
        return false;
    }
    let digits = format!("{:.*}", decimals + TAIL, value.abs());
    let tail = &digits.as_bytes()[digits.len() - TAIL..];
    tail[0] == b'5' && tail[1..].iter().all(|&b| b == b'0')
}
