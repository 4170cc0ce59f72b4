use crate::controls::{Decision, DecisionInput};
use crate::persistence::{PersistedStore, StoreKey};
use crate::plug::PlugDriver;
use crate::status::StatusEntry;
use crate::telemetry::{TelemetrySnapshot, TelemetrySource};
use chrono::DateTime;
use chrono_tz::Tz;

impl<T, P, S> super::PumpController<T, P, S>
where
    T: TelemetrySource,
    P: PlugDriver,
    S: PersistedStore,
{
    /// One control cycle at local time `now`
    ///
    /// Returns the decision, or `None` when telemetry could not be read.
    /// Runtime, status and heartbeat are persisted either way.
    pub async fn tick_at(&mut self, now: DateTime<Tz>) -> Option<Decision> {
        self.drain_inbox();

        let decision = match self.telemetry.snapshot().await {
            Ok(snapshot) => {
                let decision = self.decide_and_act(&snapshot, now).await;
                self.persist(StoreKey::SolarFree, solar_free_value(snapshot.solar_excess()))
                    .await;
                Some(decision)
            }
            Err(e) => {
                self.logger
                    .error(&format!("Telemetry unavailable, skipping decision: {}", e));
                None
            }
        };
        self.persist_cycle(now).await;

        self.check_daily_reset(now).await;
        decision
    }

    async fn decide_and_act(&mut self, snapshot: &TelemetrySnapshot, now: DateTime<Tz>) -> Decision {
        let solar_excess = snapshot.solar_excess();
        self.logger.info(&format!(
            "grid={:.0}W solar={:.0}W battery={:.0}W home={:.0}W level={:.1}% excess={:.0}W",
            snapshot.grid,
            snapshot.solar,
            snapshot.battery,
            snapshot.home,
            snapshot.battery_level,
            solar_excess
        ));

        let decision = self.engine.decide(&DecisionInput {
            telemetry: snapshot,
            plug_on: self.ctx.plug_on,
            runtime: self.ctx.runtime,
            counter: self.ctx.counter,
            now: now.naive_local(),
            manual_override: self.ctx.manual_override,
        });
        self.ctx.runtime = decision.runtime;
        self.ctx.counter = decision.counter;

        self.logger.info(&format!(
            "plug={} manual={} runtime={}s/{}s counter={} action={:?}",
            if self.ctx.plug_on { "ON" } else { "OFF" },
            self.ctx.manual_override,
            decision.runtime,
            self.engine.budget_seconds(now.naive_local()),
            decision.counter,
            decision.action
        ));

        if let Some(target) = decision.action.target() {
            let reason = decision.reason.map(|r| r.to_string()).unwrap_or_default();
            if self.ctx.manual_override {
                self.logger.info(&format!(
                    "Manual override active, not switching plug {} ({})",
                    decision.action.label(),
                    reason
                ));
            } else {
                if let Err(e) = self.plug.set_power(target).await {
                    self.logger
                        .error(&format!("Failed to queue plug command: {}", e));
                }
                self.ctx.plug_on = target;
                self.ctx.history.push(StatusEntry::new(
                    now.fixed_offset(),
                    decision.action.label(),
                    reason.clone(),
                ));
                self.logger.info(&format!(
                    "Switched plug {}: {}",
                    decision.action.label(),
                    reason
                ));
            }
        }

        decision
    }

    async fn persist_cycle(&self, now: DateTime<Tz>) {
        self.persist(StoreKey::Runtime, self.ctx.runtime.to_string())
            .await;
        self.persist_status().await;
        self.persist(StoreKey::Heartbeat, now.to_rfc3339()).await;
    }

    pub(crate) async fn persist_status(&self) {
        match self.ctx.history.to_json() {
            Ok(json) => self.persist(StoreKey::Status, json).await,
            Err(e) => self
                .logger
                .error(&format!("Failed to serialize status history: {}", e)),
        }
    }

    pub(crate) async fn persist(&self, key: StoreKey, value: String) {
        if let Err(e) = self.store.put(key, value).await {
            self.logger
                .error(&format!("Failed to persist {}: {}", key, e));
        }
    }
}

/// Whole watts; a rounded value never renders as `-0`
pub(crate) fn solar_free_value(excess: f64) -> String {
    (excess.round() as i64).to_string()
}
