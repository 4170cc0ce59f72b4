use super::link::mqtt_options;
use super::topics::Topics;
use crate::config::MqttConfig;
use crate::error::{PoolsteerError, Result};
use crate::logging::get_logger;
use crate::persistence::{PersistedStore, StoreKey};
use rumqttc::{AsyncClient, Event, Packet, QoS};
use std::time::Duration;

/// Retained-message store on the MQTT broker
///
/// Writes are retained publishes on the shared link. Reads open a
/// short-lived connection, subscribe to the key and wait for the broker to
/// deliver the retained value.
#[derive(Clone)]
pub struct MqttStore {
    client: AsyncClient,
    cfg: MqttConfig,
    topics: Topics,
    read_timeout: Duration,
    logger: crate::logging::StructuredLogger,
}

impl MqttStore {
    pub fn new(client: AsyncClient, cfg: &MqttConfig, topics: Topics) -> Self {
        Self {
            client,
            cfg: cfg.clone(),
            topics,
            read_timeout: Duration::from_millis(cfg.retained_read_timeout_ms),
            logger: get_logger("store"),
        }
    }

    async fn read_retained(&self, topic: String) -> Result<String> {
        let client_id = format!("{}-read-{}", self.cfg.client_id, uuid::Uuid::new_v4().simple());
        let (client, mut eventloop) = AsyncClient::new(mqtt_options(&self.cfg, &client_id), 10);
        client.try_subscribe(topic.clone(), QoS::AtLeastOnce)?;

        let wait = async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::Publish(p))) if p.topic == topic => {
                        return String::from_utf8(p.payload.to_vec()).map_err(|e| {
                            PoolsteerError::payload(topic.clone(), e.to_string())
                        });
                    }
                    Ok(_) => {}
                    Err(e) => return Err(PoolsteerError::from(e)),
                }
            }
        };
        let result = tokio::time::timeout(self.read_timeout, wait).await;
        let _ = client.try_disconnect();

        match result {
            Ok(value) => value,
            Err(_) => Err(PoolsteerError::timeout(format!(
                "No retained value on {} within {:?}",
                topic, self.read_timeout
            ))),
        }
    }
}

#[async_trait::async_trait]
impl PersistedStore for MqttStore {
    async fn put(&self, key: StoreKey, value: String) -> Result<()> {
        self.client
            .try_publish(self.topics.store(key), QoS::AtLeastOnce, true, value)?;
        Ok(())
    }

    async fn get(&self, key: StoreKey) -> Result<String> {
        let topic = self.topics.store(key);
        let value = self.read_retained(topic).await?;
        self.logger
            .debug(&format!("Read retained {} = {}", key, value));
        Ok(value)
    }
}
