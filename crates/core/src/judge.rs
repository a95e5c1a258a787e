//! The judgment seam — async LLM triage for ambiguous events.

use crate::context::DeviceContext;
use crate::event::DeviceEvent;
use async_trait::async_trait;

/// Outcome of LLM triage.
///
/// Failures never surface here: implementations must resolve every failure
/// mode (timeout, transport, bad reply, misconfiguration) to a push with a
/// fail-open reason. The pipeline must never drop an ambiguous event
/// because the triage layer broke.
#[derive(Debug, Clone, PartialEq)]
pub struct Judgment {
    pub push: bool,
    pub reason: String,
}

/// Resolves an ambiguous rule decision to push or drop.
#[async_trait]
pub trait Judge: Send + Sync {
    async fn evaluate(&self, event: &DeviceEvent, context: &DeviceContext) -> Judgment;
}
