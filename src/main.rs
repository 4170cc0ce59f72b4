use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use poolsteer::config::Config;
use poolsteer::controller::PumpController;
use poolsteer::mqtt::{MqttLink, MqttPlug, MqttStore, Topics};
use poolsteer::persistence::PersistedStore;
use poolsteer::telemetry::PowerwallClient;
use poolsteer::web::{AppState, serve};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Solar-steered pool pump controller
#[derive(Parser, Debug)]
#[command(name = "poolsteer", version = env!("APP_VERSION"), about)]
struct Args {
    /// Configuration file (defaults: poolsteer.yaml, /data/poolsteer.yaml, /etc/poolsteer/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load_from(args.config.as_ref())
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    poolsteer::logging::init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Poolsteer {} starting up", env!("APP_VERSION"));
    if config.uses_default_timezone() {
        warn!(
            "timezone is the default {}; offpeak window and daily reset follow UTC wall-clock time",
            poolsteer::config::DEFAULT_TIMEZONE
        );
    }

    let topics = Topics::new(config.mqtt.topic_prefix.clone(), config.plug.id.clone());
    let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
    let (link, listener) = MqttLink::new(&config.mqtt, topics.clone(), inbox_tx);
    tokio::spawn(listener.run());

    let plug = MqttPlug::new(link.client(), topics.clone(), &config.plug.id);
    let store = MqttStore::new(link.client(), &config.mqtt, topics);
    let telemetry = PowerwallClient::new(&config.powerwall)
        .map_err(|e| anyhow::anyhow!("Failed to create telemetry client: {}", e))?;

    let web_task = if config.web.enabled {
        let web_store: Arc<dyn PersistedStore> = Arc::new(store.clone());
        let state = AppState::from_config(&config, web_store, Some(link.health()))
            .map_err(|e| anyhow::anyhow!("Failed to prepare status endpoint: {}", e))?;
        let host = config.web.host.clone();
        let port = config.web.port;
        Some(tokio::spawn(async move {
            if let Err(e) = serve(state, &host, port).await {
                error!("Status endpoint error: {}", e);
            }
        }))
    } else {
        None
    };

    let mut controller = PumpController::new(config, telemetry, plug, store, inbox_rx)
        .map_err(|e| anyhow::anyhow!("Failed to create controller: {}", e))?;

    let now = Utc::now().with_timezone(&controller.tz());
    if let Err(e) = controller.bootstrap(now).await {
        error!("Startup failed: {}", e);
        if let Some(task) = web_task {
            task.abort();
        }
        return Err(anyhow::anyhow!("Startup failed: {}", e));
    }

    match controller.run().await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Control loop failed with error: {}", e);
            if let Some(task) = web_task {
                task.abort();
            }
            Err(anyhow::anyhow!("Control loop error: {}", e))
        }
    }
}
