use crate::persistence::PersistedStore;
use crate::plug::PlugDriver;
use crate::telemetry::TelemetrySource;

/// Messages posted by the MQTT listener for the control loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InboxMessage {
    /// Manual override engaged (`true`) or released
    Override(bool),
    /// Relay state reported by the plug
    PlugState(bool),
    /// Power draw reported by the plug (W)
    PlugDraw(f64),
}

impl<T, P, S> super::PumpController<T, P, S>
where
    T: TelemetrySource,
    P: PlugDriver,
    S: PersistedStore,
{
    /// Apply every message queued since the previous tick
    pub fn drain_inbox(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(msg) = self.inbox.try_recv() {
            self.apply_message(msg);
            applied += 1;
        }
        applied
    }

    fn apply_message(&mut self, msg: InboxMessage) {
        match msg {
            InboxMessage::Override(manual) => {
                if manual != self.ctx.manual_override {
                    self.logger
                        .info(&format!("Manual override set to {}", manual));
                }
                self.ctx.manual_override = manual;
            }
            InboxMessage::PlugState(on) => {
                if on != self.ctx.plug_on {
                    self.logger.info(&format!(
                        "Plug reports {}, tracked state was {}",
                        if on { "ON" } else { "OFF" },
                        if self.ctx.plug_on { "ON" } else { "OFF" }
                    ));
                }
                self.ctx.plug_on = on;
            }
            InboxMessage::PlugDraw(watts) => {
                self.logger
                    .debug(&format!("Plug drawing {:.0}W", watts));
                self.ctx.last_draw_w = Some(watts);
            }
        }
    }
}
