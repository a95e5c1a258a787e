//! Error types for the BetterClaw domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use std::path::PathBuf;
use thiserror::Error;

/// The top-level error type for all BetterClaw operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Store errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Judgment errors ---
    #[error("Judgment error: {0}")]
    Judgment(#[from] JudgmentError),

    // --- Delivery errors ---
    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Failed to write {path}: {reason}")]
    Write { path: PathBuf, reason: String },

    #[error("Failed to encode record: {0}")]
    Encode(String),
}

#[derive(Debug, Clone, Error)]
pub enum JudgmentError {
    #[error("Model not configured: {0}")]
    NotConfigured(String),

    #[error("Judgment request timed out after {0}s")]
    Timeout(u64),

    #[error("LLM API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Empty reply from model")]
    EmptyReply,

    #[error("Unparseable reply from model: {0}")]
    BadReply(String),
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Failed to spawn agent command: {0}")]
    Spawn(String),

    #[error("Agent command exited with code {code}: {stderr}")]
    CommandFailed { code: i32, stderr: String },

    #[error("Agent command timed out after {0}s")]
    Timeout(u64),
}
