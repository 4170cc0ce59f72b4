//! Configuration management for Poolsteer
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files. Every section falls back to defaults so a
//! partial file only needs to name what differs.

use crate::budget::MonthlyBudgetTable;
use crate::error::{PoolsteerError, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Zone used when the config names none
pub const DEFAULT_TIMEZONE: &str = "UTC";

mod defaults;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// MQTT broker connection and topic layout
    pub mqtt: MqttConfig,

    /// Controlled plug (Tasmota device topic)
    pub plug: PlugConfig,

    /// Powerwall gateway used as telemetry source
    pub powerwall: PowerwallConfig,

    /// Permitted pump hours per calendar month (13 entries, index 0 unused)
    pub budget: MonthlyBudgetTable,

    /// Decision thresholds
    pub thresholds: ThresholdsConfig,

    /// Off-peak tariff window
    pub offpeak: OffpeakConfig,

    /// Daily reset boundary
    pub reset: ResetConfig,

    /// Status history limits
    pub status: StatusConfig,

    /// Status endpoint binding
    pub web: WebConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Decision interval in seconds; also the runtime credited per cycle
    pub poll_interval_s: u64,

    /// IANA time zone used for offpeak, budget month and daily reset.
    ///
    /// Defaults to UTC, not the host zone. Set it to the pool's local zone
    /// (e.g. `Australia/Sydney`) or the offpeak window and the 07:00 reset
    /// run at UTC wall-clock hours.
    pub timezone: String,
}

/// MQTT broker connection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,

    /// Keep-alive interval in seconds
    pub keep_alive_s: u64,

    /// Client identifier; retained reads append a random suffix
    pub client_id: String,

    /// Prefix for the retained state topics (`<prefix>/runtime` etc.)
    pub topic_prefix: String,

    /// Fixed delay before polling the event loop again after a disconnect
    pub reconnect_delay_ms: u64,

    /// How long a retained read waits for the broker to deliver a value
    pub retained_read_timeout_ms: u64,

    /// Capacity of the outgoing request queue
    pub request_capacity: usize,
}

/// Controlled plug
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlugConfig {
    /// Tasmota topic of the plug (`cmnd/<id>/Power`, `tele/<id>/STATE`)
    pub id: String,
}

/// Powerwall local gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerwallConfig {
    /// Gateway host or IP, optionally with port
    pub host: String,

    /// Customer login email
    pub email: String,

    /// Customer login password
    pub password: String,

    /// Request timeout in seconds
    pub timeout_s: u64,

    /// Gateways ship a self-signed certificate
    pub accept_invalid_certs: bool,
}

/// Decision thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdsConfig {
    /// Solar excess (W) below which the low-solar condition holds
    pub low_solar_excess_w: f64,

    /// Battery level (%) below which the low-battery condition holds
    pub low_battery_pct: f64,

    /// Solar excess (W) above which the pump may start on surplus
    pub surplus_excess_w: f64,

    /// Minimum generation (W) required to start on surplus
    pub min_solar_w: f64,

    /// Counter increment per low-solar/low-battery cycle
    pub hysteresis_step: u32,

    /// Counter value at which the pump is turned off
    pub hysteresis_trip: u32,

    /// Counter decrement applied at the start of every cycle (0 disables)
    pub hysteresis_decay: u32,
}

/// Off-peak window in local hours, `[start_hour, end_hour)`, wrapping midnight
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OffpeakConfig {
    pub start_hour: u32,
    pub end_hour: u32,
}

/// Local time at which the daily runtime is reset
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResetConfig {
    pub hour: u32,
    pub minute: u32,
}

/// Status history limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Most recent entries kept per day
    pub max_entries: usize,
}

/// Status endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub enabled: bool,

    /// Bind address
    pub host: String,

    /// TCP port
    pub port: u16,

    /// Time zone for rendered timestamps; defaults to `timezone`
    pub display_timezone: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Optional override for the console layer
    pub console_level: Option<String>,

    /// Optional override for the file layer
    pub file_level: Option<String>,

    /// Path to log file (its directory receives the rotated files)
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the default locations
    pub fn load() -> Result<Self> {
        let default_paths = [
            "poolsteer.yaml",
            "/data/poolsteer.yaml",
            "/etc/poolsteer/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        // Fall back to default configuration
        Ok(Config::default())
    }

    /// Load an explicit file when given, otherwise search the default locations
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Self::load(),
        }
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Whether `timezone` was left at the UTC default
    pub fn uses_default_timezone(&self) -> bool {
        self.timezone == DEFAULT_TIMEZONE
    }

    /// Time zone used for control decisions
    pub fn tz(&self) -> Result<Tz> {
        parse_tz("timezone", &self.timezone)
    }

    /// Time zone used when rendering timestamps on the status endpoint
    pub fn display_tz(&self) -> Result<Tz> {
        match &self.web.display_timezone {
            Some(name) => parse_tz("web.display_timezone", name),
            None => self.tz(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.mqtt.host.is_empty() {
            return Err(PoolsteerError::validation(
                "mqtt.host",
                "Host cannot be empty",
            ));
        }

        if self.mqtt.port == 0 {
            return Err(PoolsteerError::validation(
                "mqtt.port",
                "Port must be greater than 0",
            ));
        }

        if self.mqtt.topic_prefix.is_empty() || has_wildcards(&self.mqtt.topic_prefix) {
            return Err(PoolsteerError::validation(
                "mqtt.topic_prefix",
                "Must be non-empty and free of MQTT wildcards",
            ));
        }

        if self.mqtt.request_capacity == 0 {
            return Err(PoolsteerError::validation(
                "mqtt.request_capacity",
                "Must be greater than 0",
            ));
        }

        if self.plug.id.is_empty() || has_wildcards(&self.plug.id) || self.plug.id.contains('/')
        {
            return Err(PoolsteerError::validation(
                "plug.id",
                "Must be a single non-empty topic level",
            ));
        }

        if self.poll_interval_s == 0 {
            return Err(PoolsteerError::validation(
                "poll_interval_s",
                "Must be greater than 0",
            ));
        }

        if self.thresholds.hysteresis_trip == 0 {
            return Err(PoolsteerError::validation(
                "thresholds.hysteresis_trip",
                "Must be greater than 0",
            ));
        }

        if self.offpeak.start_hour > 23 || self.offpeak.end_hour > 23 {
            return Err(PoolsteerError::validation(
                "offpeak",
                "Hours must be within 0..=23",
            ));
        }

        if self.reset.hour > 23 || self.reset.minute > 59 {
            return Err(PoolsteerError::validation(
                "reset",
                "Must be a valid local time of day",
            ));
        }

        if self.status.max_entries == 0 {
            return Err(PoolsteerError::validation(
                "status.max_entries",
                "Must be greater than 0",
            ));
        }

        self.tz()?;
        self.display_tz()?;

        Ok(())
    }
}

fn has_wildcards(topic: &str) -> bool {
    topic.contains('#') || topic.contains('+')
}

fn parse_tz(field: &str, name: &str) -> Result<Tz> {
    name.parse::<Tz>().map_err(|_| {
        PoolsteerError::validation(field.to_string(), format!("Unknown time zone '{}'", name))
    })
}
