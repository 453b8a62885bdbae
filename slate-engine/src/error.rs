//! Error types for the module runtime

use std::collections::HashMap;

use thiserror::Error;

use slate_schema::SchemaError;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur at and beyond the mutation boundary.
///
/// Schema-level failures (validation, permission, conversion) resolve before
/// anything is dispatched; the remaining variants describe what the store or
/// the wire did. A `Transport` failure is the only variant that implies an
/// optimistic change was rolled back.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Local schema validation, permission, or conversion failure
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The store answered with a declared failure envelope
    #[error("store rejected the request: {message}")]
    Store {
        message: String,
        code: Option<String>,
        field_errors: HashMap<String, Vec<String>>,
    },

    /// The request never completed (network, timeout, connection reset)
    #[error("transport failure: {message}")]
    Transport { message: String },

    /// The response arrived but was not a valid envelope
    #[error("malformed store response: {message}")]
    Protocol { message: String },

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML config parse error
    #[error("config error: {0}")]
    Config(#[from] serde_yaml_ng::Error),
}

impl EngineError {
    /// Create a store-declared failure
    pub fn store(message: impl Into<String>, code: Option<String>) -> Self {
        Self::Store {
            message: message.into(),
            code,
            field_errors: HashMap::new(),
        }
    }

    /// Create a transport failure
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a protocol (malformed envelope) error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Whether this failure came from the wire rather than from local
    /// validation or the store's own logic.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}
