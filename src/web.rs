//! Axum-based HTTP status endpoint
//!
//! Read-only JSON view over the persisted keys. Every request reads through
//! the store, so the endpoint reflects what a restarted controller would
//! see.

use crate::budget::{MonthlyBudgetTable, SECONDS_PER_HOUR};
use crate::config::Config;
use crate::error::Result;
use crate::mqtt::{LinkHealth, LinkState};
use crate::persistence::{PersistedStore, StoreKey};
use crate::status::StatusEntry;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PersistedStore>,
    pub budget: MonthlyBudgetTable,
    /// Zone used to pick the budget month
    pub tz: Tz,
    /// Zone used to render timestamps
    pub display_tz: Tz,
    pub link: Option<watch::Receiver<LinkHealth>>,
}

impl AppState {
    pub fn from_config(
        config: &Config,
        store: Arc<dyn PersistedStore>,
        link: Option<watch::Receiver<LinkHealth>>,
    ) -> Result<Self> {
        Ok(Self {
            store,
            budget: config.budget.clone(),
            tz: config.tz()?,
            display_tz: config.display_tz()?,
            link,
        })
    }
}

/// Body of `GET /api/status`; absent keys render as null
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatusView {
    pub runtime_s: Option<u64>,
    pub budget_s: u64,
    pub hours_remaining: Option<f64>,
    pub status: Option<Vec<StatusEntry>>,
    pub heartbeat: Option<String>,
    pub solar_free_w: Option<f64>,
}

/// Body of `GET /api/link`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LinkView {
    pub state: &'static str,
    pub last_success: Option<String>,
    pub disconnects: u64,
}

impl LinkView {
    fn from_health(health: &LinkHealth, tz: Tz) -> Self {
        let state = match health.state {
            LinkState::Disconnected => "disconnected",
            LinkState::Connecting => "connecting",
            LinkState::Subscribed => "subscribed",
        };
        Self {
            state,
            last_success: health
                .last_success
                .map(|t| t.with_timezone(&tz).to_rfc3339()),
            disconnects: health.disconnects,
        }
    }
}

/// Read every key once and assemble the status view
pub async fn read_status(state: &AppState, now: DateTime<Utc>) -> StatusView {
    let store = state.store.as_ref();
    let (runtime, status, heartbeat, solar_free) = tokio::join!(
        store.get(StoreKey::Runtime),
        store.get(StoreKey::Status),
        store.get(StoreKey::Heartbeat),
        store.get(StoreKey::SolarFree),
    );
    let logger = crate::logging::get_logger("web");
    let present = |key: StoreKey, r: Result<String>| match r {
        Ok(v) => Some(v),
        Err(e) => {
            logger.debug(&format!("{} unavailable: {}", key, e));
            None
        }
    };

    let runtime_s = present(StoreKey::Runtime, runtime)
        .and_then(|v| crate::controller::parse_runtime(&v));
    let status = present(StoreKey::Status, status).and_then(|v| {
        serde_json::from_str::<Vec<StatusEntry>>(&v).ok().map(|entries| {
            entries
                .into_iter()
                .map(|e| StatusEntry {
                    timestamp: e.timestamp.with_timezone(&state.display_tz).fixed_offset(),
                    ..e
                })
                .collect()
        })
    });
    let heartbeat = present(StoreKey::Heartbeat, heartbeat).map(|raw| {
        DateTime::parse_from_rfc3339(raw.trim())
            .map(|t| t.with_timezone(&state.display_tz).to_rfc3339())
            .unwrap_or(raw)
    });
    let solar_free_w =
        present(StoreKey::SolarFree, solar_free).and_then(|v| v.trim().parse::<f64>().ok());

    let month = now.with_timezone(&state.tz).month();
    let budget_s = state.budget.budget_seconds(month);
    let hours_remaining = runtime_s.map(|r| {
        let left = budget_s.saturating_sub(r) as f64 / SECONDS_PER_HOUR as f64;
        (left * 100.0).round() / 100.0
    });

    StatusView {
        runtime_s,
        budget_s,
        hours_remaining,
        status,
        heartbeat,
        solar_free_w,
    }
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(read_status(&state, Utc::now()).await)
}

pub async fn link(State(state): State<AppState>) -> Response {
    match &state.link {
        Some(rx) => {
            let health = rx.borrow().clone();
            Json(LinkView::from_health(&health, state.display_tz)).into_response()
        }
        None => (StatusCode::SERVICE_UNAVAILABLE, "no broker link").into_response(),
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/status", get(status))
        .route("/api/link", get(link))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let router = build_router(state);

    let logger = crate::logging::get_logger("web");
    logger.info(&format!(
        "Starting status endpoint; requested host={}, port={}",
        host, port
    ));

    let addr: SocketAddr = match host.parse::<IpAddr>() {
        Ok(ip) => SocketAddr::new(ip, port),
        Err(_) => {
            logger.warn(&format!("Invalid host '{}'; falling back to 127.0.0.1", host));
            ([127, 0, 0, 1], port).into()
        }
    };

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    logger.info(&format!(
        "Status endpoint listening at http://{}:{}/api/status",
        local_addr.ip(),
        local_addr.port()
    ));

    axum::serve(listener, router).await?;
    Ok(())
}
