//! Pump control loop for Poolsteer
//!
//! The controller owns every piece of mutable pump state. Each tick it
//! drains the inbox fed by the MQTT listener, samples telemetry, asks the
//! [`DecisionEngine`] what to do, executes the result through the plug
//! (unless a manual override is active) and writes the day's counters to
//! the persisted store. It also performs the daily reset.

use crate::config::Config;
use crate::controls::DecisionEngine;
use crate::error::{PoolsteerError, Result};
use crate::logging::{LogContext, get_logger_with_context};
use crate::persistence::PersistedStore;
use crate::plug::PlugDriver;
use crate::status::StatusHistory;
use crate::telemetry::TelemetrySource;
use chrono::{NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use tokio::sync::mpsc;
use tokio::time::{Duration, MissedTickBehavior, interval};

mod bootstrap;
mod cycle;
mod inbox;
mod reset;


pub use bootstrap::parse_runtime;
pub use inbox::InboxMessage;

/// Mutable state owned by the control loop
#[derive(Debug, Clone, PartialEq)]
pub struct ControlContext {
    /// Tracked plug state
    pub plug_on: bool,
    pub manual_override: bool,
    /// Seconds run today
    pub runtime: u64,
    pub counter: u32,
    pub history: StatusHistory,
    /// Last power draw reported by the plug
    pub last_draw_w: Option<f64>,
    /// Local time of the previous tick, used to detect the reset boundary
    pub last_tick: Option<NaiveDateTime>,
}

impl ControlContext {
    pub fn new(max_entries: usize) -> Self {
        Self {
            plug_on: false,
            manual_override: false,
            runtime: 0,
            counter: 0,
            history: StatusHistory::new(max_entries),
            last_draw_w: None,
            last_tick: None,
        }
    }
}

/// Control loop over a telemetry source, a plug and a persisted store
pub struct PumpController<T, P, S> {
    config: Config,
    tz: Tz,
    engine: DecisionEngine,
    reset_at: NaiveTime,
    telemetry: T,
    plug: P,
    store: S,
    inbox: mpsc::UnboundedReceiver<InboxMessage>,
    ctx: ControlContext,
    logger: crate::logging::StructuredLogger,
}

impl<T, P, S> PumpController<T, P, S>
where
    T: TelemetrySource,
    P: PlugDriver,
    S: PersistedStore,
{
    pub fn new(
        config: Config,
        telemetry: T,
        plug: P,
        store: S,
        inbox: mpsc::UnboundedReceiver<InboxMessage>,
    ) -> Result<Self> {
        let tz = config.tz()?;
        let reset_at =
            NaiveTime::from_hms_opt(config.reset.hour, config.reset.minute, 0).ok_or_else(|| {
                PoolsteerError::validation("reset", "Must be a valid local time of day")
            })?;
        let engine = DecisionEngine::from_config(&config);
        let ctx = ControlContext::new(config.status.max_entries);
        let logger =
            get_logger_with_context(LogContext::new("controller").with_plug_id(&config.plug.id));
        Ok(Self {
            config,
            tz,
            engine,
            reset_at,
            telemetry,
            plug,
            store,
            inbox,
            ctx,
            logger,
        })
    }

    pub fn context(&self) -> &ControlContext {
        &self.ctx
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    /// Run the control loop; the first decision happens one interval after start
    pub async fn run(&mut self) -> Result<()> {
        self.logger.info(&format!(
            "Starting control loop, interval {}s",
            self.config.poll_interval_s
        ));

        let mut poll_interval = interval(Duration::from_secs(self.config.poll_interval_s));
        poll_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        poll_interval.tick().await;

        loop {
            poll_interval.tick().await;
            let now = Utc::now().with_timezone(&self.tz);
            self.tick_at(now).await;
        }
    }
}
