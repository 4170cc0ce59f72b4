use crate::error::{PoolsteerError, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct StateReport {
    #[serde(rename = "POWER")]
    power: String,
}

#[derive(Debug, Deserialize)]
struct Energy {
    #[serde(rename = "Power")]
    power: f64,
}

#[derive(Debug, Deserialize)]
struct SensorReport {
    #[serde(rename = "ENERGY")]
    energy: Energy,
}

/// Parse a Tasmota `tele/<plug>/STATE` report into the relay state
pub fn parse_plug_state(topic: &str, payload: &[u8]) -> Result<bool> {
    let report: StateReport = serde_json::from_slice(payload)
        .map_err(|e| PoolsteerError::payload(topic.to_string(), e.to_string()))?;
    match report.power.as_str() {
        "ON" => Ok(true),
        "OFF" => Ok(false),
        other => Err(PoolsteerError::payload(
            topic.to_string(),
            format!("unexpected POWER value '{}'", other),
        )),
    }
}

/// Parse a Tasmota `tele/<plug>/SENSOR` report into the current draw in watts
pub fn parse_plug_power(topic: &str, payload: &[u8]) -> Result<f64> {
    let report: SensorReport = serde_json::from_slice(payload)
        .map_err(|e| PoolsteerError::payload(topic.to_string(), e.to_string()))?;
    if !report.energy.power.is_finite() || report.energy.power < 0.0 {
        return Err(PoolsteerError::payload(
            topic.to_string(),
            format!("implausible power {}", report.energy.power),
        ));
    }
    Ok(report.energy.power)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_report() {
        let t = "tele/pump/STATE";
        assert!(parse_plug_state(t, br#"{"Time":"2024-01-10T12:00:00","POWER":"ON"}"#).unwrap());
        assert!(!parse_plug_state(t, br#"{"POWER":"OFF","Wifi":{"RSSI":70}}"#).unwrap());
        assert!(parse_plug_state(t, br#"{"POWER":"TOGGLE"}"#).is_err());
        assert!(parse_plug_state(t, br#"{"Uptime":"1T00:00:00"}"#).is_err());
        assert!(parse_plug_state(t, b"ON").is_err());
    }

    #[test]
    fn test_sensor_report() {
        let t = "tele/pump/SENSOR";
        let body = br#"{"Time":"2024-01-10T12:00:00","ENERGY":{"Total":12.3,"Power":742,"Voltage":241}}"#;
        assert_eq!(parse_plug_power(t, body).unwrap(), 742.0);
        assert!(parse_plug_power(t, br#"{"ENERGY":{}}"#).is_err());
        assert!(parse_plug_power(t, br#"{"ENERGY":{"Power":-5}}"#).is_err());
        let err = parse_plug_power(t, b"{").unwrap_err();
        assert!(matches!(err, PoolsteerError::Payload { ref topic, .. } if topic == t));
    }
}
