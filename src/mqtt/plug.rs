use super::topics::Topics;
use crate::error::Result;
use crate::logging::{LogContext, get_logger_with_context};
use crate::plug::PlugDriver;
use rumqttc::{AsyncClient, QoS};

/// Tasmota plug driven over MQTT (`cmnd/<plug>/Power`, `cmnd/<plug>/TelePeriod`)
pub struct MqttPlug {
    client: AsyncClient,
    topics: Topics,
    logger: crate::logging::StructuredLogger,
}

impl MqttPlug {
    pub fn new(client: AsyncClient, topics: Topics, plug_id: &str) -> Self {
        let logger = get_logger_with_context(LogContext::new("plug").with_plug_id(plug_id));
        Self {
            client,
            topics,
            logger,
        }
    }
}

#[async_trait::async_trait]
impl PlugDriver for MqttPlug {
    async fn set_power(&self, on: bool) -> Result<()> {
        let payload = if on { "1" } else { "0" };
        self.client
            .try_publish(self.topics.plug_power_cmd(), QoS::AtLeastOnce, false, payload)?;
        self.logger
            .debug(&format!("Queued power command {}", payload));
        Ok(())
    }

    async fn set_report_interval(&self, secs: u64) -> Result<()> {
        self.client.try_publish(
            self.topics.plug_teleperiod_cmd(),
            QoS::AtLeastOnce,
            false,
            secs.to_string(),
        )?;
        self.logger
            .debug(&format!("Queued TelePeriod {}", secs));
        Ok(())
    }
}
