//! The context store — in-memory device context with durable JSON backing.
//!
//! The snapshot lives behind a `tokio::sync::RwLock`; writers are the
//! pipeline only, and every reader receives a point-in-time clone so
//! nobody observes a partially-applied update. The sibling `patterns.json`
//! document is guarded by its own mutex shared between the pattern engine
//! and the proactive scanner.

use betterclaw_core::context::DeviceContext;
use betterclaw_core::error::StoreError;
use betterclaw_core::event::DeviceEvent;
use betterclaw_core::patterns::Patterns;
use betterclaw_core::time::epoch_now;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

/// Durable store for the device context and patterns documents.
pub struct ContextStore {
    context_path: PathBuf,
    patterns_path: PathBuf,
    context: RwLock<DeviceContext>,
    patterns_io: Mutex<()>,
}

impl ContextStore {
    /// Load the context from `<state_dir>/context.json`.
    ///
    /// Never fails: a missing or corrupt file initializes the empty
    /// context (all nullable fields absent, counters zero).
    pub fn load(state_dir: &Path) -> Self {
        let context_path = state_dir.join("context.json");
        let patterns_path = state_dir.join("patterns.json");
        let context = Self::read_document(&context_path).unwrap_or_default();
        debug!(path = %context_path.display(), "Context store loaded");
        Self {
            context_path,
            patterns_path,
            context: RwLock::new(context),
            patterns_io: Mutex::new(()),
        }
    }

    /// A point-in-time clone of the current context.
    pub async fn snapshot(&self) -> DeviceContext {
        self.context.read().await.clone()
    }

    /// Apply one event to the context (day rollover, counters, source
    /// dispatch).
    pub async fn update_from_event(&self, event: &DeviceEvent) {
        self.context.write().await.apply_event(event);
    }

    /// Record a successful agent push.
    pub async fn record_push(&self) {
        self.context.write().await.record_push(epoch_now());
    }

    /// Persist the context snapshot, pretty-printed with a trailing
    /// newline. Creates parent directories as needed.
    pub async fn save(&self) -> Result<(), StoreError> {
        let snapshot = self.snapshot().await;
        let mut content = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| StoreError::Encode(e.to_string()))?;
        content.push('\n');
        Self::write_document(&self.context_path, &content)
    }

    /// The latest patterns document; missing or corrupt ⇒ defaults.
    pub async fn read_patterns(&self) -> Patterns {
        let _io = self.patterns_io.lock().await;
        Self::read_document(&self.patterns_path).unwrap_or_default()
    }

    /// Read-modify-write the patterns document under the document mutex.
    ///
    /// Both the pattern engine (full recompute preserving cooldowns) and
    /// the proactive scanner (cooldown stamps) go through here so their
    /// writes never interleave.
    pub async fn update_patterns<F>(&self, mutate: F) -> Result<Patterns, StoreError>
    where
        F: FnOnce(&mut Patterns),
    {
        let _io = self.patterns_io.lock().await;
        let mut patterns: Patterns = Self::read_document(&self.patterns_path).unwrap_or_default();
        mutate(&mut patterns);
        let mut content = serde_json::to_string_pretty(&patterns)
            .map_err(|e| StoreError::Encode(e.to_string()))?;
        content.push('\n');
        Self::write_document(&self.patterns_path, &content)?;
        Ok(patterns)
    }

    fn read_document<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
        let content = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&content) {
            Ok(doc) => Some(doc),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupt state document, starting empty");
                None
            }
        }
    }

    fn write_document(path: &Path, content: &str) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Write {
                path: parent.to_path_buf(),
                reason: e.to_string(),
            })?;
        }
        std::fs::write(path, content)
            .map_err(|e| StoreError::Write { path: path.to_path_buf(), reason: e.to_string() })
    }
}
