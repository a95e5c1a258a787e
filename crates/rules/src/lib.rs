//! Rule-based event triage — the synchronous first pass.
//!
//! The engine classifies `event × context → {push, drop, defer, ambiguous}`
//! with an ordered rule list, first match wins. It owns a process-lifetime
//! map of last-pushed times per subscription for dedup; the map is
//! rebuilt from the journal at startup rather than stored durably.

use betterclaw_core::context::DeviceContext;
use betterclaw_core::decision::{Decision, EventLogEntry, LoggedAction};
use betterclaw_core::event::DeviceEvent;
use betterclaw_core::time::local_hour;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

/// Fallback dedup cooldown for unknown subscriptions.
const DEFAULT_COOLDOWN_SECS: f64 = 1_800.0;

/// Minimum battery level change for a `battery-low` event to matter.
const BATTERY_DELTA_THRESHOLD: f64 = 0.02;

/// Per-subscription dedup cooldown, in seconds.
///
/// Keyed by subscription-id suffix; geofence subscriptions are recognized
/// by source since they carry user-defined ids.
fn cooldown_for(event: &DeviceEvent) -> f64 {
    let id = &event.subscription_id;
    if id.ends_with("battery-low") {
        3_600.0
    } else if id.ends_with("battery-critical") {
        1_800.0
    } else if id.ends_with("daily-health") {
        82_800.0
    } else if event.source == "geofence.triggered" {
        300.0
    } else {
        DEFAULT_COOLDOWN_SECS
    }
}

/// The synchronous rule classifier.
pub struct RulesEngine {
    push_budget: u32,
    /// Subscription id → fired-at of the last actual push.
    last_fired: RwLock<HashMap<String, f64>>,
}

impl RulesEngine {
    pub fn new(push_budget: u32) -> Self {
        Self { push_budget, last_fired: RwLock::new(HashMap::new()) }
    }

    /// Classify one event against the current context.
    ///
    /// Rules in order: debug passthrough, dedup, critical battery,
    /// geofence, battery-low delta, daily-health morning window, push
    /// budget, otherwise ambiguous.
    pub fn evaluate(&self, event: &DeviceEvent, context: &DeviceContext) -> Decision {
        if event.is_debug() {
            return Decision::push("debug event — always push");
        }

        let cooldown = cooldown_for(event);
        if let Some(last) = self.last_fired.read().unwrap().get(&event.subscription_id) {
            let elapsed = event.fired_at - last;
            if elapsed < cooldown {
                return Decision::drop(format!(
                    "dedup: {elapsed:.0}s since last push (cooldown {cooldown:.0}s)"
                ));
            }
        }

        if event.subscription_id == "default.battery-critical" {
            return Decision::push("critical battery level");
        }

        if event.source == "geofence.triggered" {
            return Decision::push("geofence transition");
        }

        if event.subscription_id == "default.battery-low" {
            let prior = context.device.battery.as_ref().map(|b| b.level);
            if let (Some(current), Some(prior)) = (event.number("level"), prior) {
                if (current - prior).abs() < BATTERY_DELTA_THRESHOLD {
                    return Decision::drop("battery level unchanged");
                }
            }
            return Decision::push("battery low");
        }

        if event.subscription_id == "default.daily-health" {
            let hour = local_hour(event.fired_at);
            return if (6..=10).contains(&hour) {
                Decision::push("morning health summary")
            } else {
                Decision::defer("outside morning window")
            };
        }

        if context.meta.pushes_today >= self.push_budget {
            return Decision::drop(format!(
                "push budget exhausted ({}/{})",
                context.meta.pushes_today, self.push_budget
            ));
        }

        Decision::ambiguous("no deterministic rule matched")
    }

    /// Record an actual push so dedup can suppress the next firing.
    /// Call only when the pipeline really pushed.
    pub fn record_fired(&self, subscription_id: &str, fired_at: f64) {
        self.last_fired.write().unwrap().insert(subscription_id.to_string(), fired_at);
    }

    /// Rebuild the dedup map from past push records, taking the latest
    /// fired-at per subscription.
    pub fn restore_cooldowns(&self, entries: &[EventLogEntry]) {
        let mut map = self.last_fired.write().unwrap();
        for entry in entries {
            if entry.decision != LoggedAction::Push {
                continue;
            }
            let fired_at = entry.event.fired_at;
            map.entry(entry.event.subscription_id.clone())
                .and_modify(|t| *t = t.max(fired_at))
                .or_insert(fired_at);
        }
        debug!(subscriptions = map.len(), "Dedup cooldowns restored from journal");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use betterclaw_core::context::BatteryState;
    use betterclaw_core::decision::Action;
    use betterclaw_core::time::local_epoch;
    use std::collections::HashMap;

    fn event(subscription: &str, source: &str, fired_at: f64) -> DeviceEvent {
        DeviceEvent {
            subscription_id: subscription.into(),
            source: source.into(),
            data: HashMap::new(),
            metadata: HashMap::new(),
            fired_at,
        }
    }

    fn engine() -> RulesEngine {
        RulesEngine::new(10)
    }

    #[test]
    fn debug_event_always_pushes() {
        let mut e = event("default.battery-low", "device.battery", 1_740_000_000.0);
        e.data.insert("level".into(), 0.15);
        e.data.insert("_debugFired".into(), 1.0);
        let decision = engine().evaluate(&e, &DeviceContext::default());
        assert_eq!(decision.action, Action::Push);
        assert!(decision.reason.contains("debug"));
    }

    #[test]
    fn critical_battery_always_pushes() {
        let mut e = event("default.battery-critical", "device.battery", 1_740_000_000.0);
        e.data.insert("level".into(), 0.08);
        let decision = engine().evaluate(&e, &DeviceContext::default());
        assert_eq!(decision.action, Action::Push);
    }

    #[test]
    fn geofence_always_pushes() {
        let e = event("home-zone", "geofence.triggered", 1_740_000_000.0);
        let decision = engine().evaluate(&e, &DeviceContext::default());
        assert_eq!(decision.action, Action::Push);
    }

    #[test]
    fn dedup_within_cooldown_drops() {
        let rules = engine();
        rules.record_fired("default.battery-low", 1_740_000_000.0);

        // 1800s elapsed, cooldown 3600s: dropped.
        let e = event("default.battery-low", "device.battery", 1_740_001_800.0);
        let decision = rules.evaluate(&e, &DeviceContext::default());
        assert_eq!(decision.action, Action::Drop);
        assert!(decision.reason.contains("dedup"));
        assert!(decision.reason.contains("3600"));

        // Past the cooldown: allowed through.
        let mut e = event("default.battery-low", "device.battery", 1_740_003_700.0);
        e.data.insert("level".into(), 0.2);
        let decision = rules.evaluate(&e, &DeviceContext::default());
        assert_eq!(decision.action, Action::Push);
    }

    #[test]
    fn dedup_boundary_is_strict_less_than() {
        let rules = engine();
        rules.record_fired("default.battery-critical", 1_740_000_000.0);

        // Exactly the cooldown: allowed.
        let e = event("default.battery-critical", "device.battery", 1_740_001_800.0);
        let decision = rules.evaluate(&e, &DeviceContext::default());
        assert_eq!(decision.action, Action::Push);

        // One second under: dropped.
        let e = event("default.battery-critical", "device.battery", 1_740_001_799.0);
        let decision = rules.evaluate(&e, &DeviceContext::default());
        assert_eq!(decision.action, Action::Drop);
    }

    #[test]
    fn battery_low_unchanged_level_drops() {
        let mut ctx = DeviceContext::default();
        ctx.device.battery = Some(BatteryState {
            level: 0.20,
            state: String::new(),
            is_low_power_mode: false,
            updated_at: 0.0,
        });

        let mut e = event("default.battery-low", "device.battery", 1_740_000_000.0);
        e.data.insert("level".into(), 0.21);
        let decision = engine().evaluate(&e, &ctx);
        assert_eq!(decision.action, Action::Drop);
        assert!(decision.reason.contains("unchanged"));

        // A real change pushes.
        e.data.insert("level".into(), 0.15);
        let decision = engine().evaluate(&e, &ctx);
        assert_eq!(decision.action, Action::Push);
    }

    #[test]
    fn battery_low_without_prior_level_pushes() {
        let mut e = event("default.battery-low", "device.battery", 1_740_000_000.0);
        e.data.insert("level".into(), 0.2);
        let decision = engine().evaluate(&e, &DeviceContext::default());
        assert_eq!(decision.action, Action::Push);
    }

    #[test]
    fn daily_health_defers_outside_morning_window() {
        let noon = local_epoch(2026, 2, 19, 12, 0);
        let e = event("default.daily-health", "health.summary", noon);
        let decision = engine().evaluate(&e, &DeviceContext::default());
        assert_eq!(decision.action, Action::Defer);
        assert!(decision.reason.contains("morning"));
    }

    #[test]
    fn daily_health_pushes_in_morning_window() {
        let morning = local_epoch(2026, 2, 19, 8, 0);
        let e = event("default.daily-health", "health.summary", morning);
        let decision = engine().evaluate(&e, &DeviceContext::default());
        assert_eq!(decision.action, Action::Push);
    }

    #[test]
    fn budget_exhausted_drops_unmatched_events() {
        let rules = RulesEngine::new(3);
        let mut ctx = DeviceContext::default();
        ctx.meta.pushes_today = 3;

        let e = event("custom.motion", "device.motion", 1_740_000_000.0);
        let decision = rules.evaluate(&e, &ctx);
        assert_eq!(decision.action, Action::Drop);
        assert!(decision.reason.contains("budget"));

        // Always-push rules bypass the budget.
        let e = event("zone", "geofence.triggered", 1_740_000_000.0);
        assert_eq!(rules.evaluate(&e, &ctx).action, Action::Push);
    }

    #[test]
    fn unmatched_event_is_ambiguous_under_budget() {
        let e = event("custom.motion", "device.motion", 1_740_000_000.0);
        let decision = engine().evaluate(&e, &DeviceContext::default());
        assert_eq!(decision.action, Action::Ambiguous);
    }

    #[test]
    fn restore_cooldowns_takes_latest_push() {
        use betterclaw_core::decision::{EventLogEntry, LoggedAction};

        let rules = engine();
        let make = |fired_at: f64, decision: LoggedAction| EventLogEntry {
            event: event("default.battery-low", "device.battery", fired_at),
            decision,
            reason: String::new(),
            timestamp: fired_at,
        };
        rules.restore_cooldowns(&[
            make(1_740_000_000.0, LoggedAction::Push),
            make(1_740_005_000.0, LoggedAction::Push),
            make(1_740_009_000.0, LoggedAction::Drop), // Drops do not count
        ]);

        // Within cooldown of the latest push at 1_740_005_000.
        let e = event("default.battery-low", "device.battery", 1_740_006_000.0);
        let decision = rules.evaluate(&e, &DeviceContext::default());
        assert_eq!(decision.action, Action::Drop);
    }
}
