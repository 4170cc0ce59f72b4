use super::payload::{parse_plug_power, parse_plug_state};
use super::topics::{InboundTopic, Topics};
use crate::config::MqttConfig;
use crate::controller::InboxMessage;
use crate::error::Result;
use crate::logging::get_logger;
use crate::override_watch::OverrideWatcher;
use chrono::{DateTime, Utc};
use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions, Packet, QoS,
};
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Connection state of the broker link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Disconnected,
    Connecting,
    Subscribed,
}

/// Health of the broker link, published on every state change
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkHealth {
    pub state: LinkState,
    /// Last time the event loop returned an event
    pub last_success: Option<DateTime<Utc>>,
    /// Number of disconnects since start
    pub disconnects: u64,
}

/// Broker options shared by the long-lived link and short-lived readers
pub fn mqtt_options(cfg: &MqttConfig, client_id: &str) -> MqttOptions {
    let mut opts = MqttOptions::new(client_id, cfg.host.clone(), cfg.port);
    opts.set_keep_alive(Duration::from_secs(cfg.keep_alive_s.max(5)));
    if let Some(user) = &cfg.username {
        opts.set_credentials(user.clone(), cfg.password.clone().unwrap_or_default());
    }
    opts
}

/// Long-lived broker connection
///
/// The client half is cheap to clone and is shared by the plug driver and
/// the store. The event loop is driven by the [`MqttListener`] task.
pub struct MqttLink {
    client: AsyncClient,
    health: watch::Receiver<LinkHealth>,
}

impl MqttLink {
    /// Create the link and the listener that drives it
    pub fn new(
        cfg: &MqttConfig,
        topics: Topics,
        inbox: mpsc::UnboundedSender<InboxMessage>,
    ) -> (Self, MqttListener) {
        let (client, eventloop) =
            AsyncClient::new(mqtt_options(cfg, &cfg.client_id), cfg.request_capacity);
        let (health_tx, health_rx) = watch::channel(LinkHealth::default());
        let listener = MqttListener {
            eventloop,
            client: client.clone(),
            topics,
            inbox,
            health: health_tx,
            watcher: OverrideWatcher::new(),
            reconnect_delay: Duration::from_millis(cfg.reconnect_delay_ms),
            logger: get_logger("mqtt"),
        };
        let link = Self {
            client,
            health: health_rx,
        };
        (link, listener)
    }

    pub fn client(&self) -> AsyncClient {
        self.client.clone()
    }

    pub fn health(&self) -> watch::Receiver<LinkHealth> {
        self.health.clone()
    }
}

/// Task that drives the event loop and routes inbound messages
pub struct MqttListener {
    eventloop: EventLoop,
    client: AsyncClient,
    topics: Topics,
    inbox: mpsc::UnboundedSender<InboxMessage>,
    health: watch::Sender<LinkHealth>,
    watcher: OverrideWatcher,
    reconnect_delay: Duration,
    logger: crate::logging::StructuredLogger,
}

impl MqttListener {
    /// Poll the event loop forever; polling again after an error reconnects
    pub async fn run(mut self) {
        self.set_state(LinkState::Connecting);
        loop {
            match self.eventloop.poll().await {
                Ok(event) => self.handle_event(event),
                Err(e) => self.handle_disconnect(e).await,
            }
        }
    }

    pub fn state(&self) -> LinkState {
        self.health.borrow().state
    }

    /// Process one event from the broker
    pub fn handle_event(&mut self, event: Event) {
        self.health.send_modify(|h| h.last_success = Some(Utc::now()));
        match event {
            Event::Incoming(Packet::ConnAck(ack)) => {
                if ack.code != ConnectReturnCode::Success {
                    self.logger
                        .error(&format!("Broker refused connection: {:?}", ack.code));
                    return;
                }
                match self.subscribe_all() {
                    Ok(()) => {
                        self.set_state(LinkState::Subscribed);
                        self.logger.info("Connected to broker, subscriptions sent");
                    }
                    Err(e) => self
                        .logger
                        .error(&format!("Failed to queue subscriptions: {}", e)),
                }
            }
            Event::Incoming(Packet::Publish(p)) => {
                self.route_publish(&p.topic, &p.payload);
            }
            Event::Incoming(Packet::Disconnect) => {
                self.logger.warn("Broker sent disconnect");
                self.set_state(LinkState::Disconnected);
            }
            _ => {}
        }
    }

    fn subscribe_all(&self) -> Result<()> {
        for topic in self.topics.subscriptions() {
            self.client.try_subscribe(topic, QoS::AtLeastOnce)?;
        }
        Ok(())
    }

    fn route_publish(&mut self, topic: &str, payload: &[u8]) {
        let message = match self.topics.route(topic) {
            Some(InboundTopic::Override) => Some(self.watcher.observe(payload)),
            Some(InboundTopic::PlugState) => match parse_plug_state(topic, payload) {
                Ok(on) => Some(InboxMessage::PlugState(on)),
                Err(e) => {
                    self.logger.warn(&format!("Dropping message: {}", e));
                    None
                }
            },
            Some(InboundTopic::PlugSensor) => match parse_plug_power(topic, payload) {
                Ok(watts) => Some(InboxMessage::PlugDraw(watts)),
                Err(e) => {
                    self.logger.warn(&format!("Dropping message: {}", e));
                    None
                }
            },
            None => {
                self.logger.trace(&format!("Ignoring message on {}", topic));
                None
            }
        };
        if let Some(msg) = message
            && self.inbox.send(msg).is_err()
        {
            self.logger.debug("Controller inbox closed, message dropped");
        }
    }

    async fn handle_disconnect(&mut self, err: ConnectionError) {
        self.health.send_modify(|h| {
            h.state = LinkState::Disconnected;
            h.disconnects += 1;
        });
        self.logger.error(&format!(
            "Broker connection lost: {}; retrying in {:?}",
            err, self.reconnect_delay
        ));
        tokio::time::sleep(self.reconnect_delay).await;
        self.set_state(LinkState::Connecting);
    }

    fn set_state(&self, state: LinkState) {
        self.health.send_modify(|h| h.state = state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumqttc::{ConnAck, Publish};

    fn listener() -> (
        MqttLink,
        MqttListener,
        mpsc::UnboundedReceiver<InboxMessage>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let cfg = MqttConfig::default();
        let (link, listener) = MqttLink::new(&cfg, Topics::new("pool", "pump"), tx);
        (link, listener, rx)
    }

    fn publish(topic: &str, payload: &[u8]) -> Event {
        Event::Incoming(Packet::Publish(Publish::new(
            topic,
            QoS::AtLeastOnce,
            payload.to_vec(),
        )))
    }

    #[tokio::test]
    async fn test_connack_moves_to_subscribed() {
        let (link, mut l, _rx) = listener();
        assert_eq!(l.state(), LinkState::Disconnected);
        l.handle_event(Event::Incoming(Packet::ConnAck(ConnAck {
            session_present: false,
            code: ConnectReturnCode::Success,
        })));
        assert_eq!(l.state(), LinkState::Subscribed);
        let health = link.health().borrow().clone();
        assert!(health.last_success.is_some());
    }

    #[tokio::test]
    async fn test_refused_connack_stays_put() {
        let (_link, mut l, _rx) = listener();
        l.handle_event(Event::Incoming(Packet::ConnAck(ConnAck {
            session_present: false,
            code: ConnectReturnCode::NotAuthorized,
        })));
        assert_eq!(l.state(), LinkState::Disconnected);
    }

    #[tokio::test]
    async fn test_publishes_are_routed_to_inbox() {
        let (_link, mut l, mut rx) = listener();
        l.handle_event(publish("pool/override", b"MANUAL"));
        l.handle_event(publish("tele/pump/STATE", br#"{"POWER":"ON"}"#));
        l.handle_event(publish("tele/pump/SENSOR", br#"{"ENERGY":{"Power":750}}"#));
        l.handle_event(publish("tele/pump/STATE", b"garbage"));
        l.handle_event(publish("pool/runtime", b"300"));

        assert_eq!(rx.try_recv().unwrap(), InboxMessage::Override(true));
        assert_eq!(rx.try_recv().unwrap(), InboxMessage::PlugState(true));
        assert_eq!(rx.try_recv().unwrap(), InboxMessage::PlugDraw(750.0));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_options_use_configured_identity() {
        let cfg = MqttConfig {
            username: Some("pool".to_string()),
            password: Some("secret".to_string()),
            ..MqttConfig::default()
        };
        let opts = mqtt_options(&cfg, "poolsteer");
        assert_eq!(opts.client_id(), "poolsteer");
        assert_eq!(opts.keep_alive(), Duration::from_secs(60));
    }
}
