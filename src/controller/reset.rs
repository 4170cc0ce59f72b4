use crate::persistence::{PersistedStore, StoreKey};
use crate::plug::PlugDriver;
use crate::telemetry::TelemetrySource;
use chrono::{DateTime, Duration, NaiveDateTime, NaiveTime};
use chrono_tz::Tz;

/// Whether the daily boundary `at` lies in `(prev, now]`
///
/// Yesterday's boundary is checked as well so a gap longer than the time
/// since today's boundary still resets once.
pub fn crossed_boundary(prev: NaiveDateTime, now: NaiveDateTime, at: NaiveTime) -> bool {
    let today = now.date().and_time(at);
    let yesterday = today - Duration::days(1);
    [today, yesterday]
        .iter()
        .any(|boundary| prev < *boundary && *boundary <= now)
}

impl<T, P, S> super::PumpController<T, P, S>
where
    T: TelemetrySource,
    P: PlugDriver,
    S: PersistedStore,
{
    /// Reset the day's counters if the reset boundary passed since the last tick
    pub(crate) async fn check_daily_reset(&mut self, now: DateTime<Tz>) -> bool {
        let local = now.naive_local();
        let prev = self.ctx.last_tick.replace(local);
        match prev {
            Some(prev) if crossed_boundary(prev, local, self.reset_at) => {
                self.daily_reset(now).await;
                true
            }
            _ => false,
        }
    }

    /// Zero runtime and counter, restart the status history and persist it
    pub async fn daily_reset(&mut self, now: DateTime<Tz>) {
        self.logger.info(&format!(
            "Daily reset: runtime {}s, counter {} cleared",
            self.ctx.runtime, self.ctx.counter
        ));
        self.ctx.runtime = 0;
        self.ctx.counter = 0;
        self.ctx.history.reset_with_daily_entry(now.fixed_offset());
        self.persist(StoreKey::Runtime, "0".to_string()).await;
        self.persist_status().await;
    }
}
