//! # BetterClaw Core
//!
//! Domain types, traits, and error definitions for the BetterClaw device
//! telemetry triage daemon. This crate has **zero framework dependencies**
//! — it defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! The async seams (LLM judgment, agent delivery) are defined as traits
//! here. Implementations live in their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod context;
pub mod decision;
pub mod delivery;
pub mod error;
pub mod event;
pub mod insight;
pub mod judge;
pub mod patterns;
pub mod time;
pub mod view;

// Re-export key types at crate root for ergonomics
pub use context::{ActivityState, BatteryState, DeviceContext, HealthState, LocationState, MetaState};
pub use decision::{Action, Decision, EventLogEntry, LoggedAction};
pub use delivery::AgentDelivery;
pub use error::{DeliveryError, Error, JudgmentError, Result, StoreError};
pub use event::DeviceEvent;
pub use insight::{Insight, Priority};
pub use judge::{Judge, Judgment};
pub use patterns::{EventStats, HealthTrends, Patterns, Trend};
pub use view::{render_sections, Section};
