use crate::persistence::StoreKey;

/// Which inbound stream a topic belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundTopic {
    PlugState,
    PlugSensor,
    Override,
}

/// Topic layout for one plug and one state prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    prefix: String,
    plug: String,
}

impl Topics {
    pub fn new<P: Into<String>, D: Into<String>>(prefix: P, plug: D) -> Self {
        Self {
            prefix: prefix.into(),
            plug: plug.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn plug_power_cmd(&self) -> String {
        format!("cmnd/{}/Power", self.plug)
    }

    pub fn plug_teleperiod_cmd(&self) -> String {
        format!("cmnd/{}/TelePeriod", self.plug)
    }

    pub fn plug_state(&self) -> String {
        format!("tele/{}/STATE", self.plug)
    }

    pub fn plug_sensor(&self) -> String {
        format!("tele/{}/SENSOR", self.plug)
    }

    pub fn store(&self, key: StoreKey) -> String {
        key.topic(&self.prefix)
    }

    /// Topics the listener subscribes to on every connect
    pub fn subscriptions(&self) -> Vec<String> {
        vec![
            self.plug_state(),
            self.plug_sensor(),
            self.store(StoreKey::Override),
        ]
    }

    /// Classify an incoming topic
    pub fn route(&self, topic: &str) -> Option<InboundTopic> {
        if topic == self.plug_state() {
            Some(InboundTopic::PlugState)
        } else if topic == self.plug_sensor() {
            Some(InboundTopic::PlugSensor)
        } else if topic == self.store(StoreKey::Override) {
            Some(InboundTopic::Override)
        } else {
            None
        }
    }
}
