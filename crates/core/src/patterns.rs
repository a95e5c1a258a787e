//! Derived behavioral patterns — offline analytics over the event journal,
//! distinct from the live context snapshot. Persisted to `patterns.json`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The full patterns document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Patterns {
    pub location_routines: LocationRoutines,
    pub health_trends: HealthTrends,
    pub battery_patterns: BatteryPatterns,
    pub event_stats: EventStats,
    /// Trigger id → last-fired epoch. The only field the proactive engine
    /// mutates; preserved across pattern recomputes.
    pub trigger_cooldowns: HashMap<String, f64>,
    /// Epoch of the last successful computation; 0 before the first pass.
    pub computed_at: f64,
}

/// Per-zone arrival/departure routines, split weekday vs weekend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LocationRoutines {
    pub weekday: Vec<ZoneRoutine>,
    pub weekend: Vec<ZoneRoutine>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ZoneRoutine {
    pub zone: String,
    /// Median arrival time as "HH:MM".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typical_arrive: Option<String>,
    /// Median departure time as "HH:MM".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typical_leave: Option<String>,
}

/// 7-day vs 30-day averages for the tracked health metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HealthTrends {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps_avg_7d: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps_avg_30d: Option<f64>,
    pub steps_trend: Trend,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep_avg_7d: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep_avg_30d: Option<f64>,
    pub sleep_trend: Trend,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resting_hr_avg_7d: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resting_hr_avg_30d: Option<f64>,
    pub resting_hr_trend: Trend,
}

/// Qualitative label over the ratio of a recent average to a baseline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
    #[default]
    Absent,
}

impl Trend {
    /// Classify recent vs baseline averages.
    ///
    /// `higher_is_better` inverts the polarity for metrics where a drop is
    /// an improvement (resting heart rate). Absent if either side is
    /// missing or the baseline is not positive.
    pub fn classify(recent: Option<f64>, baseline: Option<f64>, higher_is_better: bool) -> Trend {
        let (Some(recent), Some(baseline)) = (recent, baseline) else {
            return Trend::Absent;
        };
        if baseline <= 0.0 {
            return Trend::Absent;
        }
        let ratio = recent / baseline;
        let rising = ratio > 1.1;
        let falling = ratio < 0.9;
        match (higher_is_better, rising, falling) {
            (true, true, _) => Trend::Improving,
            (true, _, true) => Trend::Declining,
            (false, true, _) => Trend::Declining,
            (false, _, true) => Trend::Improving,
            _ => Trend::Stable,
        }
    }
}

/// Battery behavior statistics.
///
/// `avg_drain_per_hour` and `typical_charge_time` are declared for the
/// document format but not yet computed; consumers fall back to a fixed
/// drain estimate when absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatteryPatterns {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_drain_per_hour: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typical_charge_time: Option<String>,
    /// Low-battery events per day over the observed span.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_battery_frequency: Option<f64>,
}

/// 7-day event traffic statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventStats {
    pub events_per_day: f64,
    pub pushes_per_day: f64,
    /// Fraction of logged decisions that were drops, in `[0, 1]`.
    pub drop_rate: f64,
    /// Top sources by event count, at most five.
    pub top_sources: Vec<SourceCount>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceCount {
    pub source: String,
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trend_improving_when_recent_rises() {
        let trend = Trend::classify(Some(10_000.0), Some(7_700.0), true);
        assert_eq!(trend, Trend::Improving);
    }

    #[test]
    fn trend_thresholds_are_exclusive() {
        // Exactly 1.1 and 0.9 are stable on both polarities.
        assert_eq!(Trend::classify(Some(1.1), Some(1.0), true), Trend::Stable);
        assert_eq!(Trend::classify(Some(0.9), Some(1.0), true), Trend::Stable);
        assert_eq!(Trend::classify(Some(1.1), Some(1.0), false), Trend::Stable);
    }

    #[test]
    fn resting_hr_polarity_inverts() {
        // The same rising ratio that improves steps declines resting HR.
        assert_eq!(Trend::classify(Some(78.0), Some(60.0), false), Trend::Declining);
        assert_eq!(Trend::classify(Some(52.0), Some(60.0), false), Trend::Improving);
    }

    #[test]
    fn trend_absent_without_both_sides() {
        assert_eq!(Trend::classify(None, Some(1.0), true), Trend::Absent);
        assert_eq!(Trend::classify(Some(1.0), None, true), Trend::Absent);
        assert_eq!(Trend::classify(Some(1.0), Some(0.0), true), Trend::Absent);
    }

    #[test]
    fn patterns_document_round_trips() {
        let mut patterns = Patterns::default();
        patterns.trigger_cooldowns.insert("low-battery-away".into(), 1_740_000_000.0);
        patterns.computed_at = 1_740_000_100.0;
        let json = serde_json::to_string_pretty(&patterns).unwrap();
        let parsed: Patterns = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, patterns);
        assert!(json.contains("triggerCooldowns"));
    }

    #[test]
    fn empty_document_parses_to_defaults() {
        let parsed: Patterns = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.computed_at, 0.0);
        assert_eq!(parsed.health_trends.steps_trend, Trend::Absent);
    }
}
