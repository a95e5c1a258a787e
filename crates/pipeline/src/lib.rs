//! The event pipeline — the serialized spine of the daemon.
//!
//! One public operation, [`EventPipeline::process_event`], composes the
//! stores, rules, judgment and delivery in strict order: context update →
//! rule evaluation → (judgment for ambiguous) → journal append → delivery
//! → context save. The journal records the intended decision even when
//! delivery fails.
//!
//! Events are serialized on a single consumer lane: producers hold an
//! [`EventIntake`] handle over a bounded queue, and exactly one task drains
//! it. This makes each event's apply/evaluate/log/persist sequence
//! indivisible with respect to other events.

mod delivery;
mod message;

pub use delivery::AgentCliDelivery;
pub use message::build_message;

use betterclaw_core::decision::{Action, Decision, EventLogEntry, LoggedAction};
use betterclaw_core::delivery::AgentDelivery;
use betterclaw_core::event::DeviceEvent;
use betterclaw_core::judge::Judge;
use betterclaw_core::time::epoch_now;
use betterclaw_rules::RulesEngine;
use betterclaw_store::{ContextStore, EventLog};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// How far back push records are replayed to rebuild dedup cooldowns.
const COOLDOWN_RESTORE_WINDOW_SECS: f64 = 86_400.0;

/// The intake queue was full; the event was not accepted.
#[derive(Debug, thiserror::Error)]
#[error("event intake queue is full")]
pub struct IntakeFull;

/// Producer handle for the serialization lane. Cheap to clone.
#[derive(Clone)]
pub struct EventIntake {
    tx: mpsc::Sender<DeviceEvent>,
}

impl EventIntake {
    /// Hand an event to the pipeline without waiting for processing.
    pub fn try_enqueue(&self, event: DeviceEvent) -> Result<(), IntakeFull> {
        self.tx.try_send(event).map_err(|_| IntakeFull)
    }
}

/// The event triage pipeline.
pub struct EventPipeline {
    store: Arc<ContextStore>,
    log: Arc<EventLog>,
    rules: Arc<RulesEngine>,
    judge: Arc<dyn Judge>,
    delivery: Arc<dyn AgentDelivery>,
}

impl EventPipeline {
    pub fn new(
        store: Arc<ContextStore>,
        log: Arc<EventLog>,
        rules: Arc<RulesEngine>,
        judge: Arc<dyn Judge>,
        delivery: Arc<dyn AgentDelivery>,
    ) -> Self {
        Self { store, log, rules, judge, delivery }
    }

    /// Rebuild the rules engine's dedup map from the last day of push
    /// records. Must complete before the first event is processed.
    pub async fn restore_cooldowns(&self) {
        let since = epoch_now() - COOLDOWN_RESTORE_WINDOW_SECS;
        let entries = self.log.read_since(since).await;
        self.rules.restore_cooldowns(&entries);
    }

    /// Run one event through the full pipeline.
    pub async fn process_event(&self, event: DeviceEvent) {
        self.store.update_from_event(&event).await;
        let context = self.store.snapshot().await;

        let mut decision = self.rules.evaluate(&event, &context);
        if decision.action == Action::Ambiguous {
            let judgment = self.judge.evaluate(&event, &context).await;
            decision = if judgment.push {
                Decision::push(format!("llm: {}", judgment.reason))
            } else {
                Decision::drop(format!("llm: {}", judgment.reason))
            };
        }

        let logged = match decision.action {
            Action::Push => LoggedAction::Push,
            Action::Defer => LoggedAction::Defer,
            // Ambiguous was resolved above; everything else is a drop.
            _ => LoggedAction::Drop,
        };

        let entry = EventLogEntry {
            event: event.clone(),
            decision: logged,
            reason: decision.reason.clone(),
            timestamp: epoch_now(),
        };
        if let Err(e) = self.log.append(&entry).await {
            error!(error = %e, "Failed to append journal entry");
        }

        if logged == LoggedAction::Push {
            self.rules.record_fired(&event.subscription_id, event.fired_at);
            self.store.record_push().await;
            let context = self.store.snapshot().await;
            let message = build_message(&event, &context);
            info!(
                subscription = %event.subscription_id,
                reason = %decision.reason,
                "Pushing event to agent"
            );
            if let Err(e) = self.delivery.deliver(&message).await {
                // Best-effort: the journal keeps the push decision, no retry.
                error!(error = %e, "Agent delivery failed");
            }
        } else {
            debug!(
                subscription = %event.subscription_id,
                action = ?logged,
                reason = %decision.reason,
                "Event not pushed"
            );
        }

        if let Err(e) = self.store.save().await {
            error!(error = %e, "Failed to persist context");
        }
    }

    /// Start the single consumer lane. Returns the producer handle and the
    /// consumer task.
    pub fn spawn(self: Arc<Self>, queue_depth: usize) -> (EventIntake, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel(queue_depth);
        let pipeline = self;
        let handle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                pipeline.process_event(event).await;
            }
            debug!("Event intake closed, pipeline consumer stopping");
        });
        (EventIntake { tx }, handle)
    }
}
