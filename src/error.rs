//! Error types and handling for Poolsteer
//!
//! This module defines the error types used throughout the application,
//! providing consistent error handling and reporting.

use thiserror::Error;

/// Result type alias for Poolsteer operations
pub type Result<T> = std::result::Result<T, PoolsteerError>;

/// Main error type for Poolsteer
#[derive(Debug, Error)]
pub enum PoolsteerError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// MQTT transport errors (publish queue full, broker unreachable)
    #[error("MQTT error: {message}")]
    Mqtt { message: String },

    /// Telemetry source errors (gateway unreachable, bad response)
    #[error("Telemetry error: {message}")]
    Telemetry { message: String },

    /// A message arrived but its payload could not be interpreted
    #[error("Malformed payload on {topic}: {message}")]
    Payload { topic: String, message: String },

    /// Budget-relevant state could not be loaded at startup
    #[error("Persisted state missing for '{key}': {message}")]
    PersistedStateMissing { key: String, message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Network-related errors
    #[error("Network error: {message}")]
    Network { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Timeout errors
    #[error("Timeout error: {message}")]
    Timeout { message: String },

    /// Generic errors with context
    #[error("Error: {message}")]
    Generic { message: String },
}

impl PoolsteerError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        PoolsteerError::Config {
            message: message.into(),
        }
    }

    /// Create a new MQTT error
    pub fn mqtt<S: Into<String>>(message: S) -> Self {
        PoolsteerError::Mqtt {
            message: message.into(),
        }
    }

    /// Create a new telemetry error
    pub fn telemetry<S: Into<String>>(message: S) -> Self {
        PoolsteerError::Telemetry {
            message: message.into(),
        }
    }

    /// Create a new malformed payload error
    pub fn payload<S: Into<String>>(topic: S, message: S) -> Self {
        PoolsteerError::Payload {
            topic: topic.into(),
            message: message.into(),
        }
    }

    /// Create a new missing persisted state error
    pub fn persisted_state_missing<S: Into<String>>(key: S, message: S) -> Self {
        PoolsteerError::PersistedStateMissing {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        PoolsteerError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        PoolsteerError::Io {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        PoolsteerError::Network {
            message: message.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        PoolsteerError::Timeout {
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn generic<S: Into<String>>(message: S) -> Self {
        PoolsteerError::Generic {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for PoolsteerError {
    fn from(err: std::io::Error) -> Self {
        PoolsteerError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for PoolsteerError {
    fn from(err: serde_yaml::Error) -> Self {
        PoolsteerError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for PoolsteerError {
    fn from(err: serde_json::Error) -> Self {
        PoolsteerError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for PoolsteerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PoolsteerError::timeout(err.to_string())
        } else {
            PoolsteerError::network(err.to_string())
        }
    }
}

impl From<rumqttc::ClientError> for PoolsteerError {
    fn from(err: rumqttc::ClientError) -> Self {
        PoolsteerError::mqtt(err.to_string())
    }
}

impl From<rumqttc::ConnectionError> for PoolsteerError {
    fn from(err: rumqttc::ConnectionError) -> Self {
        PoolsteerError::mqtt(err.to_string())
    }
}

impl From<chrono::ParseError> for PoolsteerError {
    fn from(err: chrono::ParseError) -> Self {
        PoolsteerError::validation("datetime".to_string(), err.to_string())
    }
}
