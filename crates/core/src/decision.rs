//! Triage decisions and the append-only journal record.

use crate::event::DeviceEvent;
use serde::{Deserialize, Serialize};

/// The outcome of rule evaluation for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Forward to the agent.
    Push,
    /// Suppress silently.
    Drop,
    /// Not now; the subscription will fire again.
    Defer,
    /// No deterministic rule applies; escalate to LLM judgment.
    Ambiguous,
}

/// A decision plus its human-readable reason.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub action: Action,
    pub reason: String,
}

impl Decision {
    pub fn push(reason: impl Into<String>) -> Self {
        Self { action: Action::Push, reason: reason.into() }
    }

    pub fn drop(reason: impl Into<String>) -> Self {
        Self { action: Action::Drop, reason: reason.into() }
    }

    pub fn defer(reason: impl Into<String>) -> Self {
        Self { action: Action::Defer, reason: reason.into() }
    }

    pub fn ambiguous(reason: impl Into<String>) -> Self {
        Self { action: Action::Ambiguous, reason: reason.into() }
    }
}

/// Journal decisions. `Ambiguous` never reaches the log; the pipeline
/// resolves it to push or drop first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggedAction {
    Push,
    Drop,
    Defer,
}

/// One line of the `events.jsonl` journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLogEntry {
    pub event: DeviceEvent,
    pub decision: LoggedAction,
    pub reason: String,
    /// When the decision was recorded (not when the event fired).
    pub timestamp: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn actions_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&LoggedAction::Push).unwrap(), "\"push\"");
        assert_eq!(serde_json::to_string(&LoggedAction::Defer).unwrap(), "\"defer\"");
    }

    #[test]
    fn log_entry_round_trips() {
        let entry = EventLogEntry {
            event: DeviceEvent {
                subscription_id: "default.battery-low".into(),
                source: "device.battery".into(),
                data: HashMap::from([("level".to_string(), 0.2)]),
                metadata: HashMap::new(),
                fired_at: 1_740_000_000.0,
            },
            decision: LoggedAction::Drop,
            reason: "dedup: 60s since last push (cooldown 3600s)".into(),
            timestamp: 1_740_000_001.0,
        };
        let line = serde_json::to_string(&entry).unwrap();
        let parsed: EventLogEntry = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed.decision, LoggedAction::Drop);
        assert!(parsed.reason.contains("dedup"));
    }
}
