use thiserror::Error;

/// Errors raised by an [`ItemStore`](super::ItemStore) implementation.
///
/// The mapping layer never retries or rewrites these; they reach the caller
/// as they were produced.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Table not found: {0}")]
    TableNotFound(String),
    #[error("Throttled: {0}")]
    Throttled(String),
    #[error("Request failed: {0}")]
    Request(String),
    #[error("Unsupported attribute {name}: {reason}")]
    UnsupportedAttribute { name: String, reason: String },
    #[error("Missing key attribute: {0}")]
    MissingKey(&'static str),
    #[error("Connection failed: {0}")]
    Connection(String),
}
