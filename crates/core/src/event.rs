//! Device telemetry events emitted by the mobile companion app.
//!
//! Events arrive over the `betterclaw.event` RPC method with camelCase
//! field names (the companion app's native format) and are immutable once
//! received.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single telemetry event from a device subscription.
///
/// `data` carries numeric readings, `metadata` carries string labels.
/// Numeric fields may be absent; accessors return `None` rather than a
/// default so context merges can preserve prior values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceEvent {
    /// The subscription stream this event belongs to (e.g. `default.battery-low`).
    pub subscription_id: String,

    /// The physical signal source (e.g. `device.battery`, `geofence.triggered`).
    pub source: String,

    /// Numeric sensor readings.
    #[serde(default)]
    pub data: HashMap<String, f64>,

    /// String labels (zone names, charging state, transition direction).
    #[serde(default)]
    pub metadata: HashMap<String, String>,

    /// Seconds since the Unix epoch, as reported by the device.
    pub fired_at: f64,
}

impl DeviceEvent {
    /// Numeric reading accessor. Absent keys are `None`, never defaulted.
    pub fn number(&self, key: &str) -> Option<f64> {
        self.data.get(key).copied()
    }

    /// String label accessor.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Debug events bypass all filtering and are always pushed.
    pub fn is_debug(&self) -> bool {
        self.number("_debugFired") == Some(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_companion_app_payload() {
        let json = r#"{
            "subscriptionId": "default.battery-low",
            "source": "device.battery",
            "data": {"level": 0.15},
            "metadata": {"state": "unplugged"},
            "firedAt": 1740000000.5
        }"#;
        let event: DeviceEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.subscription_id, "default.battery-low");
        assert_eq!(event.number("level"), Some(0.15));
        assert_eq!(event.tag("state"), Some("unplugged"));
        assert_eq!(event.fired_at, 1740000000.5);
    }

    #[test]
    fn missing_maps_default_to_empty() {
        let json = r#"{"subscriptionId": "s", "source": "x", "firedAt": 1.0}"#;
        let event: DeviceEvent = serde_json::from_str(json).unwrap();
        assert!(event.data.is_empty());
        assert!(event.metadata.is_empty());
        assert_eq!(event.number("anything"), None);
    }

    #[test]
    fn debug_flag_requires_exact_one() {
        let mut event: DeviceEvent =
            serde_json::from_str(r#"{"subscriptionId": "s", "source": "x", "firedAt": 1.0}"#)
                .unwrap();
        assert!(!event.is_debug());
        event.data.insert("_debugFired".into(), 1.0);
        assert!(event.is_debug());
        event.data.insert("_debugFired".into(), 0.0);
        assert!(!event.is_debug());
    }
}
