use super::{TelemetrySnapshot, TelemetrySource};
use crate::config::PowerwallConfig;
use crate::error::{PoolsteerError, Result};
use crate::logging::get_logger;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct Meter {
    #[serde(default)]
    instant_power: f64,
}

#[derive(Debug, Deserialize)]
struct Aggregates {
    site: Meter,
    solar: Meter,
    battery: Meter,
    load: Meter,
}

#[derive(Debug, Deserialize)]
struct StateOfEnergy {
    percentage: f64,
}

/// Client for the Powerwall gateway's local API
pub struct PowerwallClient {
    http: reqwest::Client,
    base_url: String,
    email: String,
    password: String,
    logged_in: bool,
    logger: crate::logging::StructuredLogger,
}

impl PowerwallClient {
    /// Build a client; no request is made until the first snapshot
    pub fn new(cfg: &PowerwallConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(cfg.timeout_s.max(1)))
            .danger_accept_invalid_certs(cfg.accept_invalid_certs)
            .cookie_store(true)
            .build()?;
        let base_url = if cfg.host.starts_with("http://") || cfg.host.starts_with("https://") {
            cfg.host.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", cfg.host.trim_end_matches('/'))
        };
        Ok(Self {
            http,
            base_url,
            email: cfg.email.clone(),
            password: cfg.password.clone(),
            logged_in: false,
            logger: get_logger("powerwall"),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn login(&mut self) -> Result<()> {
        let resp = self
            .http
            .post(format!("{}/api/login/Basic", self.base_url))
            .json(&json!({
                "username": "customer",
                "email": self.email,
                "password": self.password,
                "force_sm_off": false,
            }))
            .send()
            .await?;
        if !resp.status().is_success() {
            self.logged_in = false;
            return Err(PoolsteerError::telemetry(format!(
                "Powerwall login failed: {}",
                resp.status()
            )));
        }
        self.logged_in = true;
        self.logger.info("Logged in to Powerwall gateway");
        Ok(())
    }

    /// GET a JSON document, logging in first and re-logging once on 401/403
    async fn get_json<T: serde::de::DeserializeOwned>(&mut self, path: &str) -> Result<T> {
        if !self.logged_in {
            self.login().await?;
        }
        let url = format!("{}{}", self.base_url, path);
        let mut resp = self.http.get(&url).send().await?;
        if matches!(
            resp.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            self.logger
                .warn(&format!("Session rejected on {} ({}), re-login", path, resp.status()));
            self.logged_in = false;
            self.login().await?;
            resp = self.http.get(&url).send().await?;
        }
        if !resp.status().is_success() {
            return Err(PoolsteerError::telemetry(format!(
                "GET {} returned {}",
                path,
                resp.status()
            )));
        }
        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            PoolsteerError::telemetry(format!("Unexpected response from {}: {}", path, e))
        })
    }
}

#[async_trait::async_trait]
impl TelemetrySource for PowerwallClient {
    async fn snapshot(&mut self) -> Result<TelemetrySnapshot> {
        let agg: Aggregates = self.get_json("/api/meters/aggregates").await?;
        let soe: StateOfEnergy = self.get_json("/api/system_status/soe").await?;
        let snap = TelemetrySnapshot {
            grid: agg.site.instant_power,
            solar: agg.solar.instant_power,
            battery: agg.battery.instant_power,
            home: agg.load.instant_power,
            battery_level: soe.percentage,
        };
        self.logger.debug(&format!(
            "Telemetry grid={:.0}W solar={:.0}W battery={:.0}W home={:.0}W level={:.1}%",
            snap.grid, snap.solar, snap.battery, snap.home, snap.battery_level
        ));
        Ok(snap)
    }
}
