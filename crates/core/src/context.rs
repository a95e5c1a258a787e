//! The device context — a rolling snapshot of device state reconstructed
//! from events.
//!
//! The snapshot is exclusively mutated by the event pipeline; every other
//! reader works on a point-in-time clone. Updates are field-level merges:
//! absent event fields preserve prior values, present fields overwrite.

use crate::event::DeviceEvent;
use crate::time::utc_day;
use serde::{Deserialize, Serialize};

/// The full device context snapshot, persisted to `context.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceContext {
    pub device: DeviceState,
    pub activity: ActivityState,
    pub meta: MetaState,
}

/// Physical device state: battery, location, and health metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery: Option<BatteryState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationState>,
    pub health: HealthState,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatteryState {
    /// Charge fraction in `[0, 1]`.
    pub level: f64,
    /// Charging state label as reported by the device (e.g. "charging").
    pub state: String,
    pub is_low_power_mode: bool,
    pub updated_at: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LocationState {
    pub latitude: f64,
    pub longitude: f64,
    pub horizontal_accuracy: f64,
    /// Human-readable place label (usually the geofence zone name).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub updated_at: f64,
}

/// Health metrics. Every metric is nullable; the device reports them
/// piecemeal and merges must not clobber what it has not re-sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HealthState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps_today: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_rate_avg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resting_heart_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hrv: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_energy_kcal: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep_duration_seconds: Option<f64>,
    pub updated_at: f64,
}

/// Zone occupancy and movement state driven by geofence transitions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivityState {
    /// The presently occupied zone. Non-null iff the last transition was an enter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_entered_at: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition: Option<ZoneTransition>,
    pub is_stationary: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stationary_since: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ZoneTransition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    pub at: f64,
}

/// Bookkeeping counters. `events_today`/`pushes_today` roll over on UTC
/// day boundaries at the moment the next event arrives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetaState {
    pub last_event_at: f64,
    pub events_today: u32,
    pub last_agent_push_at: f64,
    pub pushes_today: u32,
}

impl DeviceContext {
    /// Apply one event to the snapshot.
    pub fn apply_event(&mut self, event: &DeviceEvent) {
        if self.meta.last_event_at > 0.0
            && utc_day(event.fired_at) != utc_day(self.meta.last_event_at)
        {
            self.meta.events_today = 0;
            self.meta.pushes_today = 0;
        }
        self.meta.last_event_at = event.fired_at;
        self.meta.events_today += 1;

        if event.source == "device.battery" {
            self.merge_battery(event);
        } else if event.source == "geofence.triggered" {
            self.apply_geofence(event);
        } else if event.source.starts_with("health") {
            self.merge_health(event);
        }
    }

    /// Record a successful agent push.
    pub fn record_push(&mut self, now: f64) {
        self.meta.last_agent_push_at = now;
        self.meta.pushes_today += 1;
    }

    fn merge_battery(&mut self, event: &DeviceEvent) {
        let mut battery = self.device.battery.clone().unwrap_or_default();
        if let Some(level) = event.number("level") {
            battery.level = level;
        }
        if let Some(state) = event.tag("state") {
            battery.state = state.to_string();
        }
        if let Some(low_power) = event.number("isLowPowerMode") {
            battery.is_low_power_mode = low_power != 0.0;
        }
        battery.updated_at = event.fired_at;
        self.device.battery = Some(battery);
    }

    fn apply_geofence(&mut self, event: &DeviceEvent) {
        let zone = event.tag("zoneName").unwrap_or("Unknown").to_string();
        let leaving = event.tag("transition") == Some("exit");
        let prior_zone = self.activity.current_zone.take();

        if leaving {
            self.activity.last_transition = Some(ZoneTransition {
                from: Some(zone.clone()),
                to: None,
                at: event.fired_at,
            });
            self.activity.zone_entered_at = None;
            self.activity.is_stationary = false;
            self.activity.stationary_since = None;
            self.refresh_location(event, None);
        } else {
            self.activity.last_transition = Some(ZoneTransition {
                from: prior_zone,
                to: Some(zone.clone()),
                at: event.fired_at,
            });
            self.activity.current_zone = Some(zone.clone());
            self.activity.zone_entered_at = Some(event.fired_at);
            self.activity.is_stationary = true;
            self.activity.stationary_since = Some(event.fired_at);
            self.refresh_location(event, Some(zone));
        }
    }

    fn refresh_location(&mut self, event: &DeviceEvent, label: Option<String>) {
        // Nothing to record without a prior fix or fresh coordinates.
        if self.device.location.is_none()
            && event.number("latitude").is_none()
            && event.number("longitude").is_none()
        {
            return;
        }
        let mut location = self.device.location.clone().unwrap_or_default();
        if let Some(latitude) = event.number("latitude") {
            location.latitude = latitude;
        }
        if let Some(longitude) = event.number("longitude") {
            location.longitude = longitude;
        }
        if let Some(accuracy) = event.number("horizontalAccuracy") {
            location.horizontal_accuracy = accuracy;
        }
        if let Some(label) = label {
            location.label = Some(label);
        }
        location.updated_at = event.fired_at;
        self.device.location = Some(location);
    }

    fn merge_health(&mut self, event: &DeviceEvent) {
        let health = &mut self.device.health;
        let fields: [(&str, &mut Option<f64>); 7] = [
            ("stepsToday", &mut health.steps_today),
            ("distanceMeters", &mut health.distance_meters),
            ("heartRateAvg", &mut health.heart_rate_avg),
            ("restingHeartRate", &mut health.resting_heart_rate),
            ("hrv", &mut health.hrv),
            ("activeEnergyKcal", &mut health.active_energy_kcal),
            ("sleepDurationSeconds", &mut health.sleep_duration_seconds),
        ];
        for (key, slot) in fields {
            if let Some(value) = event.data.get(key).copied() {
                *slot = Some(value);
            }
        }
        health.updated_at = event.fired_at;
    }
}
