//! Manual override handling
//!
//! A user takes manual control by publishing `MANUAL` to the override key.
//! Any other payload hands control back to the controller. There is no
//! debounce: every message is forwarded to the controller inbox and takes
//! effect on its next cycle.

use crate::controller::InboxMessage;
use crate::logging::get_logger;

/// Payload that puts the controller into manual mode
pub const MANUAL: &str = "MANUAL";

/// Whether an override payload requests manual mode
pub fn parse_override(payload: &[u8]) -> bool {
    payload == MANUAL.as_bytes()
}

/// Interprets override messages and tracks the last seen value for logging
pub struct OverrideWatcher {
    last: Option<bool>,
    logger: crate::logging::StructuredLogger,
}

impl OverrideWatcher {
    pub fn new() -> Self {
        Self {
            last: None,
            logger: get_logger("override"),
        }
    }

    /// Last value observed, if any
    pub fn last(&self) -> Option<bool> {
        self.last
    }

    /// Interpret one override payload
    pub fn observe(&mut self, payload: &[u8]) -> InboxMessage {
        let manual = parse_override(payload);
        if self.last != Some(manual) {
            self.logger.info(&format!(
                "Manual override {} (payload {:?})",
                if manual { "engaged" } else { "released" },
                String::from_utf8_lossy(payload)
            ));
        }
        self.last = Some(manual);
        InboxMessage::Override(manual)
    }
}

impl Default for OverrideWatcher {
    fn default() -> Self {
        Self::new()
    }
}
