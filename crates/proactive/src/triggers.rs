//! The trigger table — fixed, ordered combined-signal predicates.
//!
//! Each trigger pairs a stable id (also its cooldown key in the patterns
//! document) with a pure predicate over the live context, the latest
//! patterns, and the current time. Predicates return `None` whenever an
//! input they need is absent.

use betterclaw_core::context::DeviceContext;
use betterclaw_core::insight::{Insight, Priority};
use betterclaw_core::patterns::{Patterns, Trend};
use betterclaw_core::time::{local_fractional_hour, local_hour, local_weekday};

/// Drain estimate used when battery patterns have not derived one yet,
/// in charge fraction per hour.
const FALLBACK_DRAIN_PER_HOUR: f64 = 0.04;

/// A proactive trigger definition.
pub struct TriggerDef {
    pub id: &'static str,
    /// Minimum seconds between firings.
    pub cooldown_secs: f64,
    pub predicate: fn(&DeviceContext, &Patterns, f64) -> Option<Insight>,
}

/// The trigger table, evaluated in declared order on every scan.
pub const TRIGGERS: &[TriggerDef] = &[
    TriggerDef { id: "low-battery-away", cooldown_secs: 4.0 * 3_600.0, predicate: low_battery_away },
    TriggerDef {
        id: "unusual-inactivity",
        cooldown_secs: 6.0 * 3_600.0,
        predicate: unusual_inactivity,
    },
    TriggerDef { id: "sleep-deficit", cooldown_secs: 24.0 * 3_600.0, predicate: sleep_deficit },
    TriggerDef {
        id: "routine-deviation",
        cooldown_secs: 4.0 * 3_600.0,
        predicate: routine_deviation,
    },
    TriggerDef {
        id: "health-weekly-digest",
        cooldown_secs: 7.0 * 86_400.0,
        predicate: health_weekly_digest,
    },
];

/// Battery under 30% while not at home: estimate the remaining hours.
fn low_battery_away(context: &DeviceContext, patterns: &Patterns, _now: f64) -> Option<Insight> {
    let battery = context.device.battery.as_ref()?;
    if battery.level >= 0.3 {
        return None;
    }
    if context.activity.current_zone.as_deref() == Some("Home") {
        return None;
    }

    let drain = patterns.battery_patterns.avg_drain_per_hour.unwrap_or(FALLBACK_DRAIN_PER_HOUR);
    let hours_remaining = (battery.level / drain).round();
    let priority = if battery.level < 0.15 { Priority::High } else { Priority::Normal };
    let mark = if priority == Priority::High { "⚠️ " } else { "" };

    Some(Insight::new(
        "low-battery-away",
        format!(
            "{mark}🪫 Battery at {:.0}% while away from home, roughly {hours_remaining:.0}h \
             left at the usual drain.",
            battery.level * 100.0
        ),
        priority,
    ))
}

/// Step count far below the pace the 7-day average predicts for this hour.
fn unusual_inactivity(context: &DeviceContext, patterns: &Patterns, now: f64) -> Option<Insight> {
    let hour = local_hour(now);
    if hour < 12 {
        return None;
    }
    let steps = context.device.health.steps_today?;
    let average = patterns.health_trends.steps_avg_7d?;

    let expected_by_now = average * (hour as f64 / 24.0);
    if steps >= 0.5 * expected_by_now {
        return None;
    }

    Some(Insight::new(
        "unusual-inactivity",
        format!(
            "🚶 Only {steps:.0} steps so far today, usually around {expected_by_now:.0} by \
             this hour."
        ),
        Priority::Normal,
    ))
}

/// Morning check: last night's sleep at least an hour under the average.
fn sleep_deficit(context: &DeviceContext, patterns: &Patterns, now: f64) -> Option<Insight> {
    let hour = local_hour(now);
    if !(7..=10).contains(&hour) {
        return None;
    }
    let actual = context.device.health.sleep_duration_seconds?;
    let average = patterns.health_trends.sleep_avg_7d?;

    let deficit = average - actual;
    if deficit < 3_600.0 {
        return None;
    }

    Some(Insight::new(
        "sleep-deficit",
        format!(
            "😴 Slept {:.1}h last night, {:.1}h under the 7-day average.",
            actual / 3_600.0,
            deficit / 3_600.0
        ),
        Priority::Normal,
    ))
}

/// Weekday check: still in a zone well past its typical departure time.
fn routine_deviation(context: &DeviceContext, patterns: &Patterns, now: f64) -> Option<Insight> {
    let dow = local_weekday(now);
    if !(1..=5).contains(&dow) {
        return None;
    }
    let zone = context.activity.current_zone.as_deref()?;
    let hour = local_fractional_hour(now);

    for routine in &patterns.location_routines.weekday {
        if routine.zone != zone {
            continue;
        }
        let Some(leave) = routine.typical_leave.as_deref().and_then(parse_hhmm) else {
            continue;
        };
        if hour > leave + 1.5 {
            return Some(Insight::new(
                "routine-deviation",
                format!(
                    "📍 Still at {zone}, usually gone by {} on weekdays.",
                    routine.typical_leave.as_deref().unwrap_or("?")
                ),
                Priority::Normal,
            ));
        }
    }
    None
}

/// Sunday-morning digest composed from trends and traffic stats.
fn health_weekly_digest(_context: &DeviceContext, patterns: &Patterns, now: f64) -> Option<Insight> {
    if local_weekday(now) != 0 {
        return None;
    }
    if !(9..=11).contains(&local_hour(now)) {
        return None;
    }

    let trends = &patterns.health_trends;
    let mut lines = Vec::new();
    if let Some(steps) = trends.steps_avg_7d {
        lines.push(format!("- Steps: {steps:.0}/day ({})", trend_label(trends.steps_trend)));
    }
    if let Some(sleep) = trends.sleep_avg_7d {
        lines.push(format!(
            "- Sleep: {:.1}h/night ({})",
            sleep / 3_600.0,
            trend_label(trends.sleep_trend)
        ));
    }
    if let Some(hr) = trends.resting_hr_avg_7d {
        lines.push(format!("- Resting HR: {hr:.0} bpm ({})", trend_label(trends.resting_hr_trend)));
    }
    if lines.is_empty() {
        return None;
    }

    let stats = &patterns.event_stats;
    lines.push(format!(
        "- Device traffic: {:.1} events/day, {:.1} pushes/day",
        stats.events_per_day, stats.pushes_per_day
    ));

    Some(Insight::new(
        "health-weekly-digest",
        format!("📊 Weekly health digest:\n{}", lines.join("\n")),
        Priority::Normal,
    ))
}

fn trend_label(trend: Trend) -> &'static str {
    match trend {
        Trend::Improving => "improving",
        Trend::Stable => "stable",
        Trend::Declining => "declining",
        Trend::Absent => "absent",
    }
}

fn parse_hhmm(text: &str) -> Option<f64> {
    let (hours, minutes) = text.split_once(':')?;
    let hours: f64 = hours.parse().ok()?;
    let minutes: f64 = minutes.parse().ok()?;
    Some(hours + minutes / 60.0)
}
