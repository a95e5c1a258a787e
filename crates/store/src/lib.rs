//! Durable state for BetterClaw — the append-only event journal and the
//! context/patterns documents.
//!
//! Storage is three files in the state directory:
//! - `events.jsonl` — one JSON-encoded decision record per line
//! - `context.json` — the live device context snapshot
//! - `patterns.json` — derived behavioral patterns
//!
//! All three are single-writer from within the process. The stores are
//! simple, portable, and human-inspectable; no database required.

mod context_store;
mod event_log;

pub use context_store::ContextStore;
pub use event_log::{EventLog, MAX_ENTRY_AGE_SECS, MAX_LOG_ENTRIES};
