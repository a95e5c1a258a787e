//! The proactive engine — periodic combined-signal insight scanning.
//!
//! Every hour (plus one early scan five minutes after startup) the engine
//! walks the trigger table in declared order against a context snapshot
//! and the latest patterns. A fired trigger's cooldown is persisted to the
//! patterns document **before** delivery is attempted, so a failing
//! delivery can never retry-loop on the next tick.

mod triggers;

pub use triggers::{TriggerDef, TRIGGERS};

use betterclaw_core::delivery::AgentDelivery;
use betterclaw_core::time::epoch_now;
use betterclaw_store::ContextStore;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Interval between scans.
pub const SCAN_INTERVAL_SECS: u64 = 3_600;

/// Delay before the early startup scan.
pub const STARTUP_SCAN_DELAY_SECS: u64 = 300;

/// The proactive trigger scanner.
pub struct ProactiveEngine {
    store: Arc<ContextStore>,
    delivery: Arc<dyn AgentDelivery>,
}

impl ProactiveEngine {
    pub fn new(store: Arc<ContextStore>, delivery: Arc<dyn AgentDelivery>) -> Self {
        Self { store, delivery }
    }

    /// Run one scan over the trigger table.
    pub async fn scan(&self, now: f64) {
        let context = self.store.snapshot().await;
        let patterns = self.store.read_patterns().await;

        for trigger in TRIGGERS {
            if let Some(last) = patterns.trigger_cooldowns.get(trigger.id) {
                if now - last < trigger.cooldown_secs {
                    continue;
                }
            }

            let Some(insight) = (trigger.predicate)(&context, &patterns, now) else {
                continue;
            };

            // Stamp the cooldown to disk before attempting delivery.
            let stamped = self
                .store
                .update_patterns(|doc| {
                    doc.trigger_cooldowns.insert(trigger.id.to_string(), now);
                })
                .await;
            if let Err(e) = stamped {
                error!(trigger = trigger.id, error = %e, "Failed to stamp trigger cooldown");
                continue;
            }

            info!(trigger = trigger.id, priority = ?insight.priority, "Proactive insight fired");
            if let Err(e) = self.delivery.deliver(&insight.message).await {
                error!(trigger = trigger.id, error = %e, "Insight delivery failed");
            }
        }
    }

    /// Start the hourly schedule and the delayed startup scan.
    pub fn spawn(self: Arc<Self>) -> Vec<JoinHandle<()>> {
        let early = {
            let engine = self.clone();
            tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_secs(STARTUP_SCAN_DELAY_SECS)).await;
                engine.scan(epoch_now()).await;
            })
        };
        let hourly = tokio::spawn(async move {
            loop {
                tokio::time::sleep(std::time::Duration::from_secs(SCAN_INTERVAL_SECS)).await;
                self.scan(epoch_now()).await;
            }
        });
        vec![early, hourly]
    }
}
