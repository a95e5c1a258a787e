//! The delivery seam — pushing enriched messages into the agent session.

use crate::error::DeliveryError;
use async_trait::async_trait;

/// Delivers one message to the agent session.
///
/// Delivery is best-effort: the pipeline logs failures and moves on, it
/// never retries and never rolls back state recorded before the attempt.
#[async_trait]
pub trait AgentDelivery: Send + Sync {
    async fn deliver(&self, message: &str) -> Result<(), DeliveryError>;
}
