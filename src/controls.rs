//! Pump control algorithm for Poolsteer
//!
//! This module contains the decision logic: given a telemetry sample, the
//! tracked plug state and the day's counters, it computes whether the pump
//! should be switched. It never performs I/O; the controller decides what
//! to execute.

use crate::budget::{MonthlyBudgetTable, SECONDS_PER_HOUR};
use crate::config::{OffpeakConfig, ThresholdsConfig};
use crate::telemetry::TelemetrySnapshot;
use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Action computed for one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlugAction {
    /// Leave the plug as it is
    NoChange,

    /// Switch the plug on
    TurnOn,

    /// Switch the plug off
    TurnOff,
}

impl PlugAction {
    /// Label written into the status history
    pub fn label(self) -> &'static str {
        match self {
            PlugAction::NoChange => "NONE",
            PlugAction::TurnOn => "ON",
            PlugAction::TurnOff => "OFF",
        }
    }

    /// Target plug state, if the action changes it
    pub fn target(self) -> Option<bool> {
        match self {
            PlugAction::NoChange => None,
            PlugAction::TurnOn => Some(true),
            PlugAction::TurnOff => Some(false),
        }
    }
}

/// Why an action was taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionReason {
    BudgetExhausted,
    InsufficientSolar,
    SolarSurplus,
    Offpeak,
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DecisionReason::BudgetExhausted => "budget exhausted",
            DecisionReason::InsufficientSolar => "insufficient solar and low battery",
            DecisionReason::SolarSurplus => "solar surplus",
            DecisionReason::Offpeak => "offpeak window",
        };
        f.write_str(s)
    }
}

/// Result of one decision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub action: PlugAction,
    /// Hysteresis counter after this cycle
    pub counter: u32,
    /// Runtime accumulator (seconds) after this cycle
    pub runtime: u64,
    pub reason: Option<DecisionReason>,
}

/// Off-peak tariff window in local hours, `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffpeakWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl OffpeakWindow {
    pub fn new(start_hour: u32, end_hour: u32) -> Self {
        Self {
            start_hour,
            end_hour,
        }
    }

    /// Whether the given local hour falls inside the window
    pub fn contains(&self, hour: u32) -> bool {
        if self.start_hour > self.end_hour {
            // Wraps midnight
            hour >= self.start_hour || hour < self.end_hour
        } else {
            hour >= self.start_hour && hour < self.end_hour
        }
    }
}

impl From<&OffpeakConfig> for OffpeakWindow {
    fn from(cfg: &OffpeakConfig) -> Self {
        Self::new(cfg.start_hour, cfg.end_hour)
    }
}

/// Everything the engine looks at for one cycle
#[derive(Debug, Clone, Copy)]
pub struct DecisionInput<'a> {
    pub telemetry: &'a TelemetrySnapshot,
    pub plug_on: bool,
    pub runtime: u64,
    pub counter: u32,
    /// Local wall-clock time of the cycle
    pub now: NaiveDateTime,
    /// Informational only; the engine computes the same decision either way
    pub manual_override: bool,
}

/// Pure decision engine
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    budget: MonthlyBudgetTable,
    thresholds: ThresholdsConfig,
    offpeak: OffpeakWindow,
    poll_interval_s: u64,
}

impl DecisionEngine {
    pub fn new(
        budget: MonthlyBudgetTable,
        thresholds: ThresholdsConfig,
        offpeak: OffpeakWindow,
        poll_interval_s: u64,
    ) -> Self {
        Self {
            budget,
            thresholds,
            offpeak,
            poll_interval_s,
        }
    }

    /// Build an engine from the loaded configuration
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::new(
            config.budget.clone(),
            config.thresholds.clone(),
            OffpeakWindow::from(&config.offpeak),
            config.poll_interval_s,
        )
    }

    /// Budget in seconds for the month of `now`
    pub fn budget_seconds(&self, now: NaiveDateTime) -> u64 {
        self.budget.budget_seconds(now.month())
    }

    /// Whether `now` falls in the off-peak window
    pub fn is_offpeak(&self, now: NaiveDateTime) -> bool {
        self.offpeak.contains(now.hour())
    }

    /// Compute the decision for one cycle
    pub fn decide(&self, input: &DecisionInput<'_>) -> Decision {
        let t = &self.thresholds;
        let solar_excess = input.telemetry.solar_excess();
        let budget = self.budget_seconds(input.now);
        let offpeak = self.is_offpeak(input.now);

        let mut counter = input.counter.saturating_sub(t.hysteresis_decay);
        let mut runtime = input.runtime;
        let mut action = PlugAction::NoChange;
        let mut reason = None;

        if input.plug_on {
            runtime = runtime.saturating_add(self.poll_interval_s);

            if runtime >= budget {
                action = PlugAction::TurnOff;
                reason = Some(DecisionReason::BudgetExhausted);
            } else if solar_excess < t.low_solar_excess_w
                && input.telemetry.battery_level < t.low_battery_pct
                && !offpeak
            {
                counter = counter.saturating_add(t.hysteresis_step);
                if counter >= t.hysteresis_trip {
                    action = PlugAction::TurnOff;
                    reason = Some(DecisionReason::InsufficientSolar);
                }
            }
        } else if runtime < budget {
            if solar_excess > t.surplus_excess_w && input.telemetry.solar > t.min_solar_w {
                action = PlugAction::TurnOn;
                reason = Some(DecisionReason::SolarSurplus);
                counter = 0;
            }
            if offpeak {
                action = PlugAction::TurnOn;
                reason = Some(DecisionReason::Offpeak);
            }
        }

        Decision {
            action,
            counter,
            runtime,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(month: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, month, 10)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn engine() -> DecisionEngine {
        DecisionEngine::new(
            MonthlyBudgetTable::default(),
            ThresholdsConfig::default(),
            OffpeakWindow::new(22, 7),
            300,
        )
    }

    fn sample(solar: f64, home: f64, battery_level: f64) -> TelemetrySnapshot {
        TelemetrySnapshot {
            grid: 0.0,
            solar,
            battery: 0.0,
            home,
            battery_level,
        }
    }

    #[test]
    fn test_offpeak_window_wraps_midnight() {
        let w = OffpeakWindow::new(22, 7);
        assert!(w.contains(22));
        assert!(w.contains(23));
        assert!(w.contains(0));
        assert!(w.contains(6));
        assert!(!w.contains(7));
        assert!(!w.contains(15));

        let day = OffpeakWindow::new(10, 14);
        assert!(day.contains(10));
        assert!(!day.contains(14));
        assert!(!day.contains(2));
    }

    #[test]
    fn test_budget_exhaustion_after_two_cycles() {
        let e = engine();
        let t = sample(5000.0, 500.0, 100.0);
        let input = DecisionInput {
            telemetry: &t,
            plug_on: true,
            runtime: 14000,
            counter: 0,
            now: at(6, 12),
            manual_override: false,
        };
        let first = e.decide(&input);
        assert_eq!(first.runtime, 14300);
        assert_eq!(first.action, PlugAction::NoChange);

        let second = e.decide(&DecisionInput {
            runtime: first.runtime,
            counter: first.counter,
            ..input
        });
        assert_eq!(second.runtime, 14600);
        assert_eq!(second.action, PlugAction::TurnOff);
        assert_eq!(second.reason, Some(DecisionReason::BudgetExhausted));
    }

    #[test]
    fn test_budget_wins_regardless_of_conditions() {
        let e = engine();
        for (solar, home, level, hour) in [
            (9000.0, 100.0, 100.0, 12),
            (0.0, 3000.0, 5.0, 15),
            (0.0, 0.0, 50.0, 23),
        ] {
            let t = sample(solar, home, level);
            let d = e.decide(&DecisionInput {
                telemetry: &t,
                plug_on: true,
                runtime: 4 * SECONDS_PER_HOUR,
                counter: 4,
                now: at(6, hour),
                manual_override: false,
            });
            assert_eq!(d.action, PlugAction::TurnOff);
            assert_eq!(d.reason, Some(DecisionReason::BudgetExhausted));
        }
    }

    #[test]
    fn test_solar_surplus_turns_on_and_resets_counter() {
        let e = engine();
        let t = sample(2600.0, 1200.0, 80.0);
        let d = e.decide(&DecisionInput {
            telemetry: &t,
            plug_on: false,
            runtime: 0,
            counter: 4,
            now: at(1, 12),
            manual_override: false,
        });
        assert_eq!(d.action, PlugAction::TurnOn);
        assert_eq!(d.reason, Some(DecisionReason::SolarSurplus));
        assert_eq!(d.counter, 0);
        assert_eq!(d.runtime, 0);
    }

    #[test]
    fn test_surplus_needs_minimum_generation() {
        let e = engine();
        // Excess is large but generation is below the floor
        let t = sample(2300.0, 0.0, 80.0);
        let d = e.decide(&DecisionInput {
            telemetry: &t,
            plug_on: false,
            runtime: 0,
            counter: 0,
            now: at(1, 12),
            manual_override: false,
        });
        assert_eq!(d.action, PlugAction::NoChange);
    }

    #[test]
    fn test_offpeak_turns_on() {
        let e = engine();
        let t = sample(0.0, 800.0, 20.0);
        let d = e.decide(&DecisionInput {
            telemetry: &t,
            plug_on: false,
            runtime: 100,
            counter: 0,
            now: at(3, 23),
            manual_override: false,
        });
        assert_eq!(d.action, PlugAction::TurnOn);
        assert_eq!(d.reason, Some(DecisionReason::Offpeak));
    }

    #[test]
    fn test_surplus_and_offpeak_reports_offpeak() {
        let e = engine();
        let t = sample(3000.0, 500.0, 90.0);
        let d = e.decide(&DecisionInput {
            telemetry: &t,
            plug_on: false,
            runtime: 0,
            counter: 3,
            now: at(12, 6),
            manual_override: false,
        });
        assert_eq!(d.action, PlugAction::TurnOn);
        assert_eq!(d.reason, Some(DecisionReason::Offpeak));
        assert_eq!(d.counter, 0);
    }

    #[test]
    fn test_low_solar_trips_at_threshold() {
        let e = engine();
        let t = sample(400.0, 1000.0, 40.0);
        let d = e.decide(&DecisionInput {
            telemetry: &t,
            plug_on: true,
            runtime: 0,
            counter: 3,
            now: at(1, 15),
            manual_override: false,
        });
        assert_eq!(d.counter, 5);
        assert_eq!(d.action, PlugAction::TurnOff);
        assert_eq!(d.reason, Some(DecisionReason::InsufficientSolar));
    }

    #[test]
    fn test_single_low_sample_does_not_trip() {
        let e = engine();
        let t = sample(400.0, 1000.0, 40.0);
        let d = e.decide(&DecisionInput {
            telemetry: &t,
            plug_on: true,
            runtime: 0,
            counter: 0,
            now: at(1, 15),
            manual_override: false,
        });
        assert_eq!(d.counter, 2);
        assert_eq!(d.action, PlugAction::NoChange);
        assert_eq!(d.runtime, 300);
    }

    #[test]
    fn test_low_solar_ignored_offpeak() {
        let e = engine();
        let t = sample(0.0, 1000.0, 10.0);
        let d = e.decide(&DecisionInput {
            telemetry: &t,
            plug_on: true,
            runtime: 0,
            counter: 4,
            now: at(1, 2),
            manual_override: false,
        });
        assert_eq!(d.counter, 4);
        assert_eq!(d.action, PlugAction::NoChange);
    }

    #[test]
    fn test_decay_applies_before_evaluation() {
        let mut thresholds = ThresholdsConfig::default();
        thresholds.hysteresis_decay = 1;
        let e = DecisionEngine::new(
            MonthlyBudgetTable::default(),
            thresholds,
            OffpeakWindow::new(22, 7),
            300,
        );
        let t = sample(3000.0, 1000.0, 90.0);
        let d = e.decide(&DecisionInput {
            telemetry: &t,
            plug_on: true,
            runtime: 0,
            counter: 0,
            now: at(1, 12),
            manual_override: false,
        });
        assert_eq!(d.counter, 0);

        let d = e.decide(&DecisionInput {
            telemetry: &t,
            plug_on: true,
            runtime: 0,
            counter: 3,
            now: at(1, 12),
            manual_override: false,
        });
        assert_eq!(d.counter, 2);
    }

    #[test]
    fn test_steady_state_is_no_change() {
        let e = engine();
        // On during off-peak: already in the target state
        let t = sample(0.0, 500.0, 90.0);
        let input = DecisionInput {
            telemetry: &t,
            plug_on: true,
            runtime: 0,
            counter: 0,
            now: at(1, 23),
            manual_override: false,
        };
        assert_eq!(e.decide(&input).action, PlugAction::NoChange);
        assert_eq!(e.decide(&input).action, PlugAction::NoChange);

        // Off with the budget spent
        let off = DecisionInput {
            plug_on: false,
            runtime: 8 * SECONDS_PER_HOUR,
            ..input
        };
        assert_eq!(e.decide(&off).action, PlugAction::NoChange);
        assert_eq!(e.decide(&off).runtime, 8 * SECONDS_PER_HOUR);
    }

    #[test]
    fn test_override_does_not_change_decision() {
        let e = engine();
        let t = sample(0.0, 500.0, 90.0);
        let base = DecisionInput {
            telemetry: &t,
            plug_on: false,
            runtime: 0,
            counter: 0,
            now: at(1, 23),
            manual_override: false,
        };
        let manual = DecisionInput {
            manual_override: true,
            ..base
        };
        assert_eq!(e.decide(&base), e.decide(&manual));
    }

    #[test]
    fn test_action_labels() {
        assert_eq!(PlugAction::TurnOn.label(), "ON");
        assert_eq!(PlugAction::TurnOff.label(), "OFF");
        assert_eq!(PlugAction::TurnOn.target(), Some(true));
        assert_eq!(PlugAction::NoChange.target(), None);
        assert_eq!(
            DecisionReason::InsufficientSolar.to_string(),
            "insufficient solar and low battery"
        );
    }
}
