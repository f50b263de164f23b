//! ==============================================================================
//! speech.rs - spoken spoilage alerts
//! ==============================================================================
//!
//! purpose:
//!     turns a high-risk reading into one spoken warning. at most one
//!     utterance is active at a time: a new alert cancels whatever is still
//!     being spoken and takes its place (single slot, replace on write).
//!
//! design:
//!     - SpeechEngine: the platform text-to-speech capability (trait)
//!     - CommandSpeech: drives an external tts program (espeak-ng, say, ...)
//!     - NullSpeech: no speech on this host; alerts become diagnostics
//!     - AlertNotifier: availability check + cancel-then-speak, never fails
//!
//! relationships:
//!     - used by: dashboard.rs (refresh_latest, after the log append)
//!     - reads: config.rs (AlertConfig command and lang)
//!
//! ==============================================================================

use anyhow::{anyhow, Context, Result};
use std::sync::{Arc, Mutex};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

/// one spoken message
#[derive(Clone, Debug, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub lang: String,
}

pub trait SpeechEngine: Send + Sync {
    fn is_available(&self) -> bool;
    /// stop the active utterance, if any
    fn cancel(&self) -> Result<()>;
    /// start speaking; returns without waiting for playback to finish
    fn speak(&self, utterance: &Utterance) -> Result<()>;
}

// ==============================================================================
// command-backed engine
// ==============================================================================

pub struct CommandSpeech {
    program: String,
    available: bool,
    active: Mutex<Option<Child>>,
}

impl CommandSpeech {
    pub fn new(program: impl Into<String>) -> Self {
        let program = program.into();
        let available = which::which(&program).is_ok();
        if !available {
            debug!("[SPEECH] {} not found on PATH", program);
        }
        Self { program, available, active: Mutex::new(None) }
    }

    #[cfg(test)]
    fn active_pid(&self) -> Option<u32> {
        let slot = self.active.lock().unwrap_or_else(|p| p.into_inner());
        slot.as_ref().and_then(Child::id)
    }
}

impl SpeechEngine for CommandSpeech {
    fn is_available(&self) -> bool {
        self.available
    }

    fn cancel(&self) -> Result<()> {
        let mut slot = self.active.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(mut child) = slot.take() {
            // already finished on its own: nothing to stop
            if child.try_wait()?.is_none() {
                child.start_kill().context("failed to stop previous utterance")?;
                debug!("[SPEECH] Cancelled previous utterance");
            }
        }
        Ok(())
    }

    fn speak(&self, utterance: &Utterance) -> Result<()> {
        let child = Command::new(&self.program)
            .arg("-v")
            .arg(&utterance.lang)
            .arg(&utterance.text)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| anyhow!("failed to run {}: {}", self.program, e))?;

        let mut slot = self.active.lock().unwrap_or_else(|p| p.into_inner());
        *slot = Some(child);
        Ok(())
    }
}

/// engine for hosts without text-to-speech
pub struct NullSpeech;

impl SpeechEngine for NullSpeech {
    fn is_available(&self) -> bool {
        false
    }

    fn cancel(&self) -> Result<()> {
        Ok(())
    }

    fn speak(&self, _utterance: &Utterance) -> Result<()> {
        Err(anyhow!("speech synthesis not supported"))
    }
}

// ==============================================================================
// alert notifier
// ==============================================================================

#[derive(Clone)]
pub struct AlertNotifier {
    engine: Arc<dyn SpeechEngine>,
    lang: String,
}

impl AlertNotifier {
    pub fn new(engine: Arc<dyn SpeechEngine>, lang: impl Into<String>) -> Self {
        Self { engine, lang: lang.into() }
    }

    /// warning spoken for a given rounded percent
    pub fn alert_text(percent: i64) -> String {
        format!(
            "Warning: Spoilage probability is {} percent. Take corrective action.",
            percent
        )
    }

    /// cancel any active utterance and speak `text`; problems are only logged
    pub fn speak_alert(&self, text: &str) {
        if !self.engine.is_available() {
            warn!("[SPEECH] Speech synthesis not supported.");
            return;
        }

        let utterance = Utterance { text: text.to_string(), lang: self.lang.clone() };
        let result = self.engine.cancel().and_then(|_| self.engine.speak(&utterance));
        match result {
            Ok(()) => debug!("[SPEECH] Speaking: {}", text),
            Err(e) => warn!("[SPEECH] Speech error: {:#}", e),
        }
    }
}
