//! Error types for corpkv
//!
//! Provides a unified error type for storage, protocol and network operations.
//! Request-level outcomes returned to clients live in [`crate::gateway::GatewayError`].

use thiserror::Error;

/// Result type alias using CorpError
pub type Result<T> = std::result::Result<T, CorpError>;

/// Unified error type for corpkv operations
#[derive(Debug, Error)]
pub enum CorpError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("Table corruption detected: {0}")]
    Corruption(String),

    #[error("Storage initialization failed: {0}")]
    StorageInit(String),

    // -------------------------------------------------------------------------
    // Data Errors
    // -------------------------------------------------------------------------
    #[error("{0}")]
    InvalidItem(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Cannot bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CorpError {
    /// True when the peer went away (reset, abort, broken pipe, EOF)
    pub fn is_disconnect(&self) -> bool {
        match self {
            CorpError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}
