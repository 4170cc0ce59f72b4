//! Controlled plug
//!
//! The pump hangs off a switchable smart plug. Commands are fire-and-forget:
//! a successful return means the command was queued, not that the plug
//! acknowledged it. The plug reports its actual state separately.

use crate::error::Result;

/// Command interface to the controlled plug
#[async_trait::async_trait]
pub trait PlugDriver: Send + Sync {
    /// Switch the plug on or off
    async fn set_power(&self, on: bool) -> Result<()>;

    /// Ask the plug to report state and energy every `secs` seconds
    async fn set_report_interval(&self, secs: u64) -> Result<()>;
}
