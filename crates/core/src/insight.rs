//! Proactive insights — combined-signal observations pushed to the agent
//! outside the event flow.

/// Delivery priority for an insight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Normal,
    High,
}

/// A fired proactive trigger, ready for delivery.
#[derive(Debug, Clone)]
pub struct Insight {
    /// Stable trigger id, also the cooldown key in the patterns document.
    pub id: &'static str,
    pub message: String,
    pub priority: Priority,
}

impl Insight {
    pub fn new(id: &'static str, message: impl Into<String>, priority: Priority) -> Self {
        Self { id, message: message.into(), priority }
    }
}
