//! The pattern engine — a periodic analytical pass over the event journal.
//!
//! Every six hours (and once immediately at startup) the engine reads the
//! journal window, derives location routines, health trends, battery
//! statistics and event traffic stats, persists them to `patterns.json`
//! while preserving the proactive trigger cooldowns, and finally rotates
//! the journal. Tick failures are logged and the schedule continues.

use betterclaw_core::decision::{EventLogEntry, LoggedAction};
use betterclaw_core::patterns::{
    BatteryPatterns, EventStats, HealthTrends, LocationRoutines, Patterns, SourceCount, Trend,
    ZoneRoutine,
};
use betterclaw_core::time::{epoch_now, local_fractional_hour, local_weekday};
use betterclaw_store::{ContextStore, EventLog};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Interval between analytical passes.
pub const PATTERN_INTERVAL_SECS: u64 = 6 * 3_600;

/// The periodic pattern analyzer.
pub struct PatternEngine {
    store: Arc<ContextStore>,
    log: Arc<EventLog>,
    window_days: u32,
}

impl PatternEngine {
    pub fn new(store: Arc<ContextStore>, log: Arc<EventLog>, window_days: u32) -> Self {
        Self { store, log, window_days }
    }

    /// One full pass: compute, persist preserving cooldowns, rotate.
    pub async fn run_once(&self) {
        let now = epoch_now();
        let computed = self.compute(now).await;

        let result = self
            .store
            .update_patterns(|doc| {
                let cooldowns = std::mem::take(&mut doc.trigger_cooldowns);
                *doc = computed;
                doc.trigger_cooldowns = cooldowns;
            })
            .await;
        match result {
            Ok(_) => info!("Patterns recomputed"),
            Err(e) => error!(error = %e, "Failed to persist patterns"),
        }

        match self.log.rotate().await {
            Ok(0) => {}
            Ok(dropped) => info!(dropped, "Event journal rotated"),
            Err(e) => error!(error = %e, "Journal rotation failed"),
        }
    }

    /// Derive a fresh patterns document from the journal window.
    /// `trigger_cooldowns` is left empty; the caller preserves the prior
    /// map when persisting.
    pub async fn compute(&self, now: f64) -> Patterns {
        let since = now - self.window_days as f64 * 86_400.0;
        let entries = self.log.read_since(since).await;

        Patterns {
            location_routines: location_routines(&entries),
            health_trends: health_trends(&entries, now),
            battery_patterns: battery_patterns(&entries),
            event_stats: event_stats(&entries, now),
            trigger_cooldowns: Default::default(),
            computed_at: now,
        }
    }

    /// Start the 6-hourly schedule with an immediate first pass.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(std::time::Duration::from_secs(PATTERN_INTERVAL_SECS));
            loop {
                ticker.tick().await;
                self.run_once().await;
            }
        })
    }
}

/// Per-zone arrival/departure medians, split weekday vs weekend by the
/// local day of week (Sunday and Saturday are weekend).
fn location_routines(entries: &[EventLogEntry]) -> LocationRoutines {
    type Buckets = BTreeMap<String, (Vec<f64>, Vec<f64>)>;
    let mut weekday: Buckets = BTreeMap::new();
    let mut weekend: Buckets = BTreeMap::new();

    for entry in entries {
        let event = &entry.event;
        if event.source != "geofence.triggered" {
            continue;
        }
        let zone = event.tag("zoneName").unwrap_or("Unknown").to_string();
        let dow = local_weekday(event.fired_at);
        let bucket = if dow == 0 || dow == 6 { &mut weekend } else { &mut weekday };
        let (arrivals, leaves) = bucket.entry(zone).or_default();
        let hour = local_fractional_hour(event.fired_at);
        if event.tag("transition") == Some("exit") {
            leaves.push(hour);
        } else {
            arrivals.push(hour);
        }
    }

    LocationRoutines { weekday: to_routines(weekday), weekend: to_routines(weekend) }
}

fn to_routines(buckets: BTreeMap<String, (Vec<f64>, Vec<f64>)>) -> Vec<ZoneRoutine> {
    buckets
        .into_iter()
        .map(|(zone, (arrivals, leaves))| ZoneRoutine {
            zone,
            typical_arrive: median_hhmm(&arrivals),
            typical_leave: median_hhmm(&leaves),
        })
        .collect()
}

fn median_hhmm(hours: &[f64]) -> Option<String> {
    if hours.is_empty() {
        return None;
    }
    let mut sorted = hours.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    };
    Some(format_hhmm(median))
}

fn format_hhmm(fractional_hour: f64) -> String {
    let total_minutes = (fractional_hour * 60.0).round() as i64;
    let hours = (total_minutes / 60).rem_euclid(24);
    let minutes = total_minutes.rem_euclid(60);
    format!("{hours:02}:{minutes:02}")
}

/// 7-day vs full-window averages per health metric, with ratio trends.
/// The full window stands in for the 30-day baseline.
fn health_trends(entries: &[EventLogEntry], now: f64) -> HealthTrends {
    let week_ago = now - 7.0 * 86_400.0;
    let health: Vec<&EventLogEntry> =
        entries.iter().filter(|e| e.event.source.starts_with("health")).collect();

    let average = |key: &str, since: f64| -> Option<f64> {
        let values: Vec<f64> = health
            .iter()
            .filter(|e| e.timestamp >= since)
            .filter_map(|e| e.event.number(key))
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    };

    let steps_avg_7d = average("stepsToday", week_ago);
    let steps_avg_30d = average("stepsToday", f64::NEG_INFINITY);
    let sleep_avg_7d = average("sleepDurationSeconds", week_ago);
    let sleep_avg_30d = average("sleepDurationSeconds", f64::NEG_INFINITY);
    let resting_hr_avg_7d = average("restingHeartRate", week_ago);
    let resting_hr_avg_30d = average("restingHeartRate", f64::NEG_INFINITY);

    HealthTrends {
        steps_trend: Trend::classify(steps_avg_7d, steps_avg_30d, true),
        sleep_trend: Trend::classify(sleep_avg_7d, sleep_avg_30d, true),
        resting_hr_trend: Trend::classify(resting_hr_avg_7d, resting_hr_avg_30d, false),
        steps_avg_7d,
        steps_avg_30d,
        sleep_avg_7d,
        sleep_avg_30d,
        resting_hr_avg_7d,
        resting_hr_avg_30d,
    }
}

/// Low-battery events per day over the observed span.
fn battery_patterns(entries: &[EventLogEntry]) -> BatteryPatterns {
    let low_events = entries
        .iter()
        .filter(|e| {
            let id = &e.event.subscription_id;
            id.ends_with("battery-low") || id.ends_with("battery-critical")
        })
        .count();

    let low_battery_frequency = match (entries.first(), entries.last()) {
        (Some(first), Some(last)) => {
            let day_span = ((last.timestamp - first.timestamp) / 86_400.0).max(1.0);
            Some(low_events as f64 / day_span)
        }
        _ => None,
    };

    BatteryPatterns {
        // Declared in the document format but not derived yet; consumers
        // fall back to a fixed drain estimate.
        avg_drain_per_hour: None,
        typical_charge_time: None,
        low_battery_frequency,
    }
}

/// 7-day traffic statistics with the top five sources by count.
fn event_stats(entries: &[EventLogEntry], now: f64) -> EventStats {
    let week_ago = now - 7.0 * 86_400.0;
    let recent: Vec<&EventLogEntry> =
        entries.iter().filter(|e| e.timestamp >= week_ago).collect();

    let total = recent.len();
    let pushes = recent.iter().filter(|e| e.decision == LoggedAction::Push).count();
    let drops = recent.iter().filter(|e| e.decision == LoggedAction::Drop).count();

    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for entry in &recent {
        *counts.entry(entry.event.source.as_str()).or_default() += 1;
    }
    let mut top_sources: Vec<SourceCount> = counts
        .into_iter()
        .map(|(source, count)| SourceCount { source: source.to_string(), count })
        .collect();
    top_sources.sort_by(|a, b| b.count.cmp(&a.count).then(a.source.cmp(&b.source)));
    top_sources.truncate(5);

    EventStats {
        events_per_day: total as f64 / 7.0,
        pushes_per_day: pushes as f64 / 7.0,
        drop_rate: if total == 0 { 0.0 } else { drops as f64 / total as f64 },
        top_sources,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use betterclaw_core::event::DeviceEvent;
    use betterclaw_core::time::local_epoch;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn entry(
        subscription: &str,
        source: &str,
        data: &[(&str, f64)],
        metadata: &[(&str, &str)],
        decision: LoggedAction,
        timestamp: f64,
    ) -> EventLogEntry {
        EventLogEntry {
            event: DeviceEvent {
                subscription_id: subscription.into(),
                source: source.into(),
                data: data.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
                metadata: metadata.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
                fired_at: timestamp,
            },
            decision,
            reason: String::new(),
            timestamp,
        }
    }

    fn health_entry(steps: f64, timestamp: f64) -> EventLogEntry {
        entry(
            "default.daily-health",
            "health.summary",
            &[("stepsToday", steps)],
            &[],
            LoggedAction::Push,
            timestamp,
        )
    }

    #[test]
    fn steps_trend_improving_over_baseline() {
        // 7 recent readings at 10k, 23 older ones at 7k: the 7-day average
        // is 10_000, the full-window average is 7_700, ratio ≈ 1.30.
        let now = 1_740_000_000.0;
        let mut entries = Vec::new();
        for i in 0..7 {
            entries.push(health_entry(10_000.0, now - (i + 1) as f64 * 3_600.0));
        }
        for i in 0..23 {
            entries.push(health_entry(7_000.0, now - (8 + i) as f64 * 86_400.0));
        }

        let trends = health_trends(&entries, now);
        assert_eq!(trends.steps_avg_7d, Some(10_000.0));
        assert!((trends.steps_avg_30d.unwrap() - 7_700.0).abs() < 1.0);
        assert_eq!(trends.steps_trend, Trend::Improving);
    }

    #[test]
    fn resting_hr_trend_inverts_polarity() {
        let now = 1_740_000_000.0;
        let mut entries = Vec::new();
        for i in 0..3 {
            entries.push(entry(
                "default.daily-health",
                "health.summary",
                &[("restingHeartRate", 70.0)],
                &[],
                LoggedAction::Push,
                now - (i + 1) as f64 * 3_600.0,
            ));
        }
        for i in 0..10 {
            entries.push(entry(
                "default.daily-health",
                "health.summary",
                &[("restingHeartRate", 55.0)],
                &[],
                LoggedAction::Push,
                now - (8 + i) as f64 * 86_400.0,
            ));
        }

        let trends = health_trends(&entries, now);
        assert_eq!(trends.resting_hr_trend, Trend::Declining);
    }

    #[test]
    fn trends_absent_without_data() {
        let trends = health_trends(&[], 1_740_000_000.0);
        assert_eq!(trends.steps_avg_7d, None);
        assert_eq!(trends.steps_trend, Trend::Absent);
    }

    #[test]
    fn median_formats_hhmm() {
        assert_eq!(median_hhmm(&[8.0, 9.0, 8.5]), Some("08:30".into()));
        assert_eq!(median_hhmm(&[8.0, 9.0]), Some("08:30".into()));
        assert_eq!(median_hhmm(&[17.75]), Some("17:45".into()));
        assert_eq!(median_hhmm(&[]), None);
    }

    #[test]
    fn location_routines_partition_weekday_weekend() {
        let mut entries = Vec::new();
        // Arrivals at the Office around 09:00 on Mon/Tue/Wed (2026-02-23..25).
        for day in 23..26 {
            let t = local_epoch(2026, 2, day, 9, 0);
            entries.push(entry(
                "office-zone",
                "geofence.triggered",
                &[],
                &[("zoneName", "Office"), ("transition", "enter")],
                LoggedAction::Push,
                t,
            ));
            let leave = local_epoch(2026, 2, day, 17, 30);
            entries.push(entry(
                "office-zone",
                "geofence.triggered",
                &[],
                &[("zoneName", "Office"), ("transition", "exit")],
                LoggedAction::Push,
                leave,
            ));
        }
        // One Saturday arrival at the Gym (2026-02-28).
        entries.push(entry(
            "gym-zone",
            "geofence.triggered",
            &[],
            &[("zoneName", "Gym"), ("transition", "enter")],
            LoggedAction::Push,
            local_epoch(2026, 2, 28, 10, 15),
        ));

        let routines = location_routines(&entries);
        assert_eq!(routines.weekday.len(), 1);
        let office = &routines.weekday[0];
        assert_eq!(office.zone, "Office");
        assert_eq!(office.typical_arrive.as_deref(), Some("09:00"));
        assert_eq!(office.typical_leave.as_deref(), Some("17:30"));

        assert_eq!(routines.weekend.len(), 1);
        assert_eq!(routines.weekend[0].zone, "Gym");
        assert_eq!(routines.weekend[0].typical_arrive.as_deref(), Some("10:15"));
        assert_eq!(routines.weekend[0].typical_leave, None);
    }

    #[test]
    fn unlabeled_zone_buckets_as_unknown() {
        let entries = vec![entry(
            "zone",
            "geofence.triggered",
            &[],
            &[("transition", "enter")],
            LoggedAction::Push,
            local_epoch(2026, 2, 24, 9, 0),
        )];
        let routines = location_routines(&entries);
        assert_eq!(routines.weekday[0].zone, "Unknown");
    }

    #[test]
    fn low_battery_frequency_per_day_span() {
        let now = 1_740_000_000.0;
        let entries = vec![
            entry("default.battery-low", "device.battery", &[], &[], LoggedAction::Push, now),
            entry(
                "default.battery-critical",
                "device.battery",
                &[],
                &[],
                LoggedAction::Push,
                now + 86_400.0,
            ),
            entry("other", "device.motion", &[], &[], LoggedAction::Drop, now + 2.0 * 86_400.0),
        ];
        let battery = battery_patterns(&entries);
        // 2 low events over a 2-day span.
        assert_eq!(battery.low_battery_frequency, Some(1.0));
        assert_eq!(battery.avg_drain_per_hour, None);
    }

    #[test]
    fn day_span_floors_at_one() {
        let now = 1_740_000_000.0;
        let entries = vec![
            entry("default.battery-low", "device.battery", &[], &[], LoggedAction::Push, now),
            entry("default.battery-low", "device.battery", &[], &[], LoggedAction::Push, now + 60.0),
        ];
        let battery = battery_patterns(&entries);
        assert_eq!(battery.low_battery_frequency, Some(2.0));
    }

    #[test]
    fn event_stats_over_seven_days() {
        let now = 1_740_000_000.0;
        let mut entries = vec![
            entry("a", "device.battery", &[], &[], LoggedAction::Push, now - 1_000.0),
            entry("b", "device.battery", &[], &[], LoggedAction::Drop, now - 2_000.0),
            entry("c", "geofence.triggered", &[], &[], LoggedAction::Push, now - 3_000.0),
            entry("d", "health.summary", &[], &[], LoggedAction::Defer, now - 4_000.0),
        ];
        // Outside the 7-day stats window, inside the journal window.
        entries.push(entry("e", "device.motion", &[], &[], LoggedAction::Drop, now - 10.0 * 86_400.0));

        let stats = event_stats(&entries, now);
        assert!((stats.events_per_day - 4.0 / 7.0).abs() < 1e-9);
        assert!((stats.pushes_per_day - 2.0 / 7.0).abs() < 1e-9);
        assert!((stats.drop_rate - 0.25).abs() < 1e-9);
        assert_eq!(stats.top_sources[0].source, "device.battery");
        assert_eq!(stats.top_sources[0].count, 2);
    }

    #[test]
    fn event_stats_empty_is_zeroed() {
        let stats = event_stats(&[], 1_740_000_000.0);
        assert_eq!(stats.drop_rate, 0.0);
        assert!(stats.top_sources.is_empty());
    }

    #[tokio::test]
    async fn run_once_preserves_cooldowns_and_rotates() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(ContextStore::load(dir.path()));
        let log = Arc::new(EventLog::new(dir.path().join("events.jsonl")));

        // A prior cooldown stamp from the proactive engine.
        store
            .update_patterns(|p| {
                p.trigger_cooldowns.insert("low-battery-away".into(), 123.0);
            })
            .await
            .unwrap();

        let now = epoch_now();
        log.append(&health_entry(8_000.0, now - 3_600.0)).await.unwrap();

        let engine = PatternEngine::new(store.clone(), log.clone(), 14);
        engine.run_once().await;

        let patterns = store.read_patterns().await;
        assert!(patterns.computed_at > 0.0);
        assert_eq!(patterns.health_trends.steps_avg_7d, Some(8_000.0));
        assert_eq!(patterns.trigger_cooldowns.get("low-battery-away"), Some(&123.0));
    }
}
