//! MQTT transport for Poolsteer
//!
//! One long-lived connection carries plug commands, retained state writes
//! and the inbound plug/override streams. The listener task owns the event
//! loop and hands decoded messages to the controller inbox.

mod link;
mod payload;
mod plug;
mod store;
mod topics;

pub use link::{LinkHealth, LinkState, MqttLink, MqttListener, mqtt_options};
pub use payload::{parse_plug_power, parse_plug_state};
pub use plug::MqttPlug;
pub use store::MqttStore;
pub use topics::{InboundTopic, Topics};
