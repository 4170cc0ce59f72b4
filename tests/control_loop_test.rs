use chrono::{DateTime, Duration, TimeZone};
use chrono_tz::Tz;
use poolsteer::config::Config;
use poolsteer::controller::{InboxMessage, PumpController};
use poolsteer::error::Result;
use poolsteer::persistence::{MemoryStore, StoreKey};
use poolsteer::plug::PlugDriver;
use poolsteer::status::StatusHistory;
use poolsteer::telemetry::{TelemetrySnapshot, TelemetrySource};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Cycles through a fixed list of samples
struct CyclingTelemetry {
    samples: Vec<TelemetrySnapshot>,
    next: usize,
}

#[async_trait::async_trait]
impl TelemetrySource for CyclingTelemetry {
    async fn snapshot(&mut self) -> Result<TelemetrySnapshot> {
        let s = self.samples[self.next % self.samples.len()];
        self.next += 1;
        Ok(s)
    }
}

#[derive(Clone, Default)]
struct CountingPlug {
    power: Arc<Mutex<Vec<bool>>>,
}

#[async_trait::async_trait]
impl PlugDriver for CountingPlug {
    async fn set_power(&self, on: bool) -> Result<()> {
        self.power.lock().unwrap().push(on);
        Ok(())
    }

    async fn set_report_interval(&self, _secs: u64) -> Result<()> {
        Ok(())
    }
}

fn samples() -> Vec<TelemetrySnapshot> {
    [
        (3500.0, 800.0, 95.0),
        (200.0, 1500.0, 20.0),
        (0.0, 400.0, 60.0),
        (2600.0, 1200.0, 45.0),
        (100.0, 900.0, 10.0),
    ]
    .into_iter()
    .map(|(solar, home, battery_level)| TelemetrySnapshot {
        grid: home - solar,
        solar,
        battery: 0.0,
        home,
        battery_level,
    })
    .collect()
}

fn start() -> DateTime<Tz> {
    chrono_tz::Australia::Sydney
        .with_ymd_and_hms(2025, 2, 3, 5, 0, 0)
        .unwrap()
}

async fn controller(
    override_value: &str,
) -> (
    PumpController<CyclingTelemetry, CountingPlug, Arc<MemoryStore>>,
    CountingPlug,
    Arc<MemoryStore>,
    mpsc::UnboundedSender<InboxMessage>,
) {
    let config = Config {
        timezone: "Australia/Sydney".to_string(),
        ..Config::default()
    };
    let store = Arc::new(MemoryStore::with_values([
        (StoreKey::Runtime, "0"),
        (StoreKey::Status, "[]"),
        (StoreKey::Override, override_value),
    ]));
    let plug = CountingPlug::default();
    let (tx, rx) = mpsc::unbounded_channel();
    let telemetry = CyclingTelemetry {
        samples: samples(),
        next: 0,
    };
    let mut c = PumpController::new(config, telemetry, plug.clone(), store.clone(), rx).unwrap();
    c.bootstrap(start()).await.unwrap();
    (c, plug, store, tx)
}

#[tokio::test]
async fn manual_override_blocks_every_command_for_a_day() {
    let (mut c, plug, store, tx) = controller("MANUAL").await;

    let mut now = start();
    for i in 0..288 {
        now += Duration::minutes(5);
        // Someone toggles the plug by hand now and then
        if i % 37 == 0 {
            tx.send(InboxMessage::PlugState(i % 2 == 0)).unwrap();
        }
        c.tick_at(now).await;
    }

    assert!(plug.power.lock().unwrap().is_empty());
    let history = StatusHistory::from_json(&store.value(StoreKey::Status).unwrap(), 500).unwrap();
    // Only the daily reset entry is recorded
    assert_eq!(history.len(), 1);
    assert_eq!(history.last().unwrap().reason, "Daily Reset");
}

#[tokio::test]
async fn automatic_day_stays_within_budget_plus_one_interval() {
    let (mut c, plug, _store, _tx) = controller("AUTO").await;
    let budget = 8 * 3600;

    let mut now = start();
    let mut max_runtime = 0;
    for _ in 0..287 {
        now += Duration::minutes(5);
        c.tick_at(now).await;
        max_runtime = max_runtime.max(c.context().runtime);
        if c.context().plug_on {
            assert!(c.context().runtime < budget + 300);
        }
    }

    assert!(max_runtime <= budget + 300);
    // Commands alternate with the tracked state: never two ONs in a row
    let calls = plug.power.lock().unwrap().clone();
    assert!(calls.windows(2).all(|w| !(w[0] && w[1])));
}

#[tokio::test]
async fn heartbeat_and_solar_free_written_every_cycle() {
    let (mut c, _plug, store, _tx) = controller("AUTO").await;
    let now = start() + Duration::minutes(5);
    c.tick_at(now).await;
    assert_eq!(
        store.value(StoreKey::Heartbeat).as_deref(),
        Some("2025-02-03T05:05:00+11:00")
    );
    assert_eq!(store.value(StoreKey::SolarFree).as_deref(), Some("2700"));

    c.tick_at(now + Duration::minutes(5)).await;
    assert_eq!(store.value(StoreKey::SolarFree).as_deref(), Some("-1300"));
}
