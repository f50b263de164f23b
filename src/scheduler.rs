//! ==============================================================================
//! scheduler.rs - fixed-period refresh loop
//! ==============================================================================
//!
//! purpose:
//!     fires one tick immediately, then one every polling interval. each tick
//!     spawns the two refresh paths as independent tasks and does not wait
//!     for them:
//!
//!         tick N ──┬── spawn refresh_latest   (fields, log, alert)
//!                  └── spawn refresh_chart    (history, redraw)
//!
//!     a slow tick never delays the next one, so ticks may overlap. a late
//!     response simply overwrites whatever an earlier-finishing tick wrote.
//!     there is no backoff and no in-flight guard; the next tick is the retry.
//!
//! relationships:
//!     - used by: main.rs (runs until ctrl-c)
//!     - drives: dashboard.rs
//!
//! ==============================================================================

use crate::client::TelemetrySource;
use crate::dashboard::Dashboard;

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

pub struct Scheduler<S> {
    dashboard: Dashboard<S>,
    period: Duration,
    ticks: u64,
}

impl<S: TelemetrySource> Scheduler<S> {
    pub fn new(dashboard: Dashboard<S>, period: Duration) -> Self {
        // tokio::time::interval panics on a zero period
        let period = period.max(Duration::from_millis(1));
        Self { dashboard, period, ticks: 0 }
    }

    /// spawn both refresh paths for one tick
    pub fn tick(&mut self) -> (JoinHandle<()>, JoinHandle<()>) {
        self.ticks += 1;
        let id = self.ticks;
        debug!("[TICK] #{} fired", id);

        let latest = {
            let dashboard = self.dashboard.clone();
            tokio::spawn(async move { dashboard.refresh_latest().await })
        };
        let chart = {
            let dashboard = self.dashboard.clone();
            tokio::spawn(async move { dashboard.refresh_chart().await })
        };
        (latest, chart)
    }

    /// run forever; the first tick fires immediately
    pub async fn run(mut self) {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            // fire and forget: outcomes land in the dashboard state
            let _ = self.tick();
        }
    }
}
