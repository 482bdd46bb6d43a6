//! Core error types for focusflow-core.
//!
//! Construction-time misconfiguration is the only hard failure in the crate;
//! everything else (malformed persisted state, store backend failures)
//! degrades to defaults and is reported as a warning.

use thiserror::Error;

/// Top-level error type for the recommendation core.
#[derive(Error, Debug)]
pub enum AiError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// State-store errors
    #[error("State store error: {0}")]
    Store(#[from] StoreError),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Construction-time configuration errors.
///
/// The engine cannot produce a meaningful recommendation with no arms or an
/// out-of-range exploration rate, so these fail loudly instead of defaulting.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configured duration set is empty
    #[error("bandit arm set is empty")]
    EmptyArmSet,

    /// Exploration probability outside the valid range
    #[error("exploration rate epsilon must be within [0.0, 1.0], got {0}")]
    EpsilonOutOfRange(f64),
}

/// Errors from the external persistence capability.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing store cannot be reached
    #[error("store backend unavailable: {0}")]
    Unavailable(String),

    /// Encoding the state blob failed
    #[error("failed to encode state: {0}")]
    Encode(#[source] serde_json::Error),

    /// Decoding the state blob failed
    #[error("failed to decode state: {0}")]
    Decode(#[source] serde_json::Error),

    /// IO errors from file-backed stores
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
