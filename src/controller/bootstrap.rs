use crate::error::{PoolsteerError, Result};
use crate::override_watch::parse_override;
use crate::persistence::{PersistedStore, StoreKey};
use crate::plug::PlugDriver;
use crate::status::StatusHistory;
use crate::telemetry::TelemetrySource;
use chrono::DateTime;
use chrono_tz::Tz;

/// Parse a persisted runtime value (whole or fractional non-negative seconds)
pub fn parse_runtime(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if let Ok(secs) = raw.parse::<u64>() {
        return Some(secs);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Some(v.round() as u64),
        _ => None,
    }
}

impl<T, P, S> super::PumpController<T, P, S>
where
    T: TelemetrySource,
    P: PlugDriver,
    S: PersistedStore,
{
    /// Restore the day's state and put the plug into a known state
    ///
    /// Fails when `runtime`, `status` or `override` cannot be read or parsed.
    pub async fn bootstrap(&mut self, now: DateTime<Tz>) -> Result<()> {
        if let Err(e) = self
            .plug
            .set_report_interval(self.config.poll_interval_s)
            .await
        {
            self.logger
                .error(&format!("Failed to set plug report interval: {}", e));
        }

        let raw = self.load_key(StoreKey::Runtime).await?;
        let runtime = parse_runtime(&raw).ok_or_else(|| {
            PoolsteerError::persisted_state_missing(
                StoreKey::Runtime.as_str().to_string(),
                format!("unparsable value '{}'", raw),
            )
        })?;

        let raw = self.load_key(StoreKey::Status).await?;
        let history = StatusHistory::from_json(&raw, self.config.status.max_entries)
            .map_err(|e| {
                PoolsteerError::persisted_state_missing(
                    StoreKey::Status.as_str().to_string(),
                    format!("unparsable value: {}", e),
                )
            })?;

        let raw = self.load_key(StoreKey::Override).await?;
        let manual = parse_override(raw.as_bytes());

        self.ctx.runtime = runtime;
        self.ctx.counter = 0;
        self.ctx.history = history;
        self.ctx.manual_override = manual;
        self.ctx.plug_on = false;
        self.ctx.last_tick = Some(now.naive_local());

        if manual {
            self.logger
                .info("Manual override active at startup, not switching plug off");
        } else if let Err(e) = self.plug.set_power(false).await {
            self.logger
                .error(&format!("Failed to queue initial plug off: {}", e));
        }

        self.logger.info(&format!(
            "Restored runtime={}s status_entries={} manual={}",
            runtime,
            self.ctx.history.len(),
            manual
        ));
        Ok(())
    }

    async fn load_key(&self, key: StoreKey) -> Result<String> {
        self.store.get(key).await.map_err(|e| match e {
            PoolsteerError::PersistedStateMissing { .. } => e,
            other => PoolsteerError::persisted_state_missing(
                key.as_str().to_string(),
                other.to_string(),
            ),
        })
    }
}
