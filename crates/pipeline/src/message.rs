//! Message enrichment — turning a pushed event into the text the agent
//! session receives.
//!
//! The body leads with a per-source emoji line, followed by a one-line
//! context summary. Debug events get a distinct outer prefix so test
//! traffic is never mistaken for live telemetry.

use betterclaw_core::context::DeviceContext;
use betterclaw_core::event::DeviceEvent;

/// Build the enriched delivery message for one pushed event.
pub fn build_message(event: &DeviceEvent, context: &DeviceContext) -> String {
    let prefix = if event.is_debug() { "[BetterClaw debug]" } else { "[BetterClaw]" };
    let body = event_body(event, context);
    let summary = context_summary(context);
    if summary.is_empty() {
        format!("{prefix} {body}")
    } else {
        format!("{prefix} {body}\n{summary}")
    }
}

fn event_body(event: &DeviceEvent, context: &DeviceContext) -> String {
    match event.source.as_str() {
        "device.battery" => {
            let level = event
                .number("level")
                .or_else(|| context.device.battery.as_ref().map(|b| b.level));
            let mut body = match level {
                Some(level) => format!("🔋 Battery at {:.0}%", level * 100.0),
                None => "🔋 Battery update".to_string(),
            };
            if event.subscription_id.ends_with("battery-critical") {
                body.push_str(" (critical)");
            }
            if let Some(state) = event.tag("state") {
                body.push_str(&format!(", {state}"));
            }
            body
        }
        "geofence.triggered" => {
            let zone = event.tag("zoneName").unwrap_or("Unknown");
            if event.tag("transition") == Some("exit") {
                format!("📍 Left {zone}")
            } else {
                format!("📍 Arrived at {zone}")
            }
        }
        source if source.starts_with("health") => {
            let mut parts = Vec::new();
            if let Some(steps) = event.number("stepsToday") {
                parts.push(format!("{steps:.0} steps"));
            }
            if let Some(hr) = event.number("restingHeartRate") {
                parts.push(format!("resting HR {hr:.0}"));
            }
            if let Some(sleep) = event.number("sleepDurationSeconds") {
                parts.push(format!("{:.1}h sleep", sleep / 3600.0));
            }
            if parts.is_empty() {
                "❤️ Health update".to_string()
            } else {
                format!("❤️ Health update: {}", parts.join(", "))
            }
        }
        source => format!("📡 {} fired from {source}", event.subscription_id),
    }
}

/// One line of live context, the fields worth the agent's attention.
fn context_summary(context: &DeviceContext) -> String {
    let mut parts = Vec::new();
    if let Some(battery) = &context.device.battery {
        parts.push(format!("battery {:.0}%", battery.level * 100.0));
    }
    if let Some(zone) = &context.activity.current_zone {
        parts.push(format!("at {zone}"));
    } else if let Some(location) = &context.device.location {
        if let Some(label) = &location.label {
            parts.push(format!("near {label}"));
        }
    }
    if let Some(steps) = context.device.health.steps_today {
        parts.push(format!("{steps:.0} steps today"));
    }
    parts.push(format!("{} pushes today", context.meta.pushes_today));
    format!("Context: {}", parts.join(" · "))
}
