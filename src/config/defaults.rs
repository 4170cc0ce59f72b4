use super::*;

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            username: None,
            password: None,
            keep_alive_s: 60,
            client_id: "poolsteer".to_string(),
            topic_prefix: "pool".to_string(),
            reconnect_delay_ms: 2000,
            retained_read_timeout_ms: 5000,
            request_capacity: 64,
        }
    }
}

impl Default for PlugConfig {
    fn default() -> Self {
        Self {
            id: "pool_pump".to_string(),
        }
    }
}

impl Default for PowerwallConfig {
    fn default() -> Self {
        Self {
            host: "192.168.91.1".to_string(),
            email: String::new(),
            password: String::new(),
            timeout_s: 10,
            accept_invalid_certs: true,
        }
    }
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            low_solar_excess_w: -500.0,
            low_battery_pct: 50.0,
            surplus_excess_w: 1100.0,
            min_solar_w: 2400.0,
            hysteresis_step: 2,
            hysteresis_trip: 5,
            hysteresis_decay: 0,
        }
    }
}

impl Default for OffpeakConfig {
    fn default() -> Self {
        Self {
            start_hour: 22,
            end_hour: 7,
        }
    }
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self { hour: 7, minute: 0 }
    }
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self { max_entries: 500 }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "0.0.0.0".to_string(),
            port: 5555,
            display_timezone: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            console_level: None,
            file_level: None,
            file: "/tmp/poolsteer.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mqtt: MqttConfig::default(),
            plug: PlugConfig::default(),
            powerwall: PowerwallConfig::default(),
            budget: MonthlyBudgetTable::default(),
            thresholds: ThresholdsConfig::default(),
            offpeak: OffpeakConfig::default(),
            reset: ResetConfig::default(),
            status: StatusConfig::default(),
            web: WebConfig::default(),
            logging: LoggingConfig::default(),
            poll_interval_s: 300,
            timezone: DEFAULT_TIMEZONE.to_string(),
        }
    }
}
