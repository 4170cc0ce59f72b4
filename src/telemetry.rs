//! Telemetry sources for Poolsteer
//!
//! A telemetry source supplies one instantaneous sample of the site's power
//! flows per control cycle.

use crate::error::Result;
use serde::{Deserialize, Serialize};

mod powerwall;

pub use powerwall::PowerwallClient;

/// Instantaneous power flows at one poll instant (watts, battery in percent)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    /// Grid import (positive) or export (negative)
    pub grid: f64,
    pub solar: f64,
    /// Battery discharge (positive) or charge (negative)
    pub battery: f64,
    pub home: f64,
    pub battery_level: f64,
}

impl TelemetrySnapshot {
    /// Generation beyond household consumption
    pub fn solar_excess(&self) -> f64 {
        self.solar - self.home
    }
}

/// Source of power telemetry
#[async_trait::async_trait]
pub trait TelemetrySource: Send {
    async fn snapshot(&mut self) -> Result<TelemetrySnapshot>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solar_excess() {
        let s = TelemetrySnapshot {
            solar: 2600.0,
            home: 1200.0,
            ..Default::default()
        };
        assert_eq!(s.solar_excess(), 1400.0);

        let s = TelemetrySnapshot {
            solar: 100.0,
            home: 700.0,
            ..Default::default()
        };
        assert_eq!(s.solar_excess(), -600.0);
    }
}
