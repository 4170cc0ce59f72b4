//! # Poolsteer - solar-steered pool pump controller
//!
//! Decides every few minutes whether a pool pump on a Tasmota smart plug
//! should run, balancing a monthly-varying daily runtime budget, solar
//! surplus, battery charge, an off-peak tariff window and a manual
//! override.
//!
//! ## Architecture
//!
//! - `config`: YAML configuration and validation
//! - `logging`: Structured logging and tracing
//! - `budget`: Monthly runtime budget table
//! - `controls`: Pure decision engine
//! - `controller`: Control loop owning all mutable pump state
//! - `telemetry`: Power telemetry sources (Powerwall gateway)
//! - `plug`: Plug command interface
//! - `persistence`: Retained key/value store interface
//! - `mqtt`: Broker link, plug driver and retained store over MQTT
//! - `override_watch`: Manual override interpretation
//! - `status`: Daily status history
//! - `web`: Read-only JSON status endpoint

pub mod budget;
pub mod config;
pub mod controller;
pub mod controls;
pub mod error;
pub mod logging;
pub mod mqtt;
pub mod override_watch;
pub mod persistence;
pub mod plug;
pub mod status;
pub mod telemetry;
pub mod web;


// Re-export commonly used types
pub use config::Config;
pub use controller::{InboxMessage, PumpController};
pub use error::{PoolsteerError, Result};
