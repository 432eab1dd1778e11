use thiserror::Error;

use crate::shape::ShapeError;
use crate::storage::{KeyType, StoreError};

use super::KeyRole;

/// Errors raised while declaring or using a [`RecordMapper`](super::RecordMapper).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MapperError {
    #[error("No unique {role} key prefix for {kind}.{field} after {attempts} attempts")]
    PrefixExhausted {
        kind: String,
        field: String,
        role: KeyRole,
        attempts: usize,
    },
    #[error("Type mismatch for {role} key: expected {expected}, found {found}")]
    TypeMismatch {
        role: KeyRole,
        expected: KeyType,
        found: KeyType,
    },
    #[error("Malformed {role} key {key:?}: expected prefix {expected:?}")]
    KeyFormat {
        role: KeyRole,
        key: String,
        expected: String,
    },
    #[error("Validation failed: {0}")]
    Validation(ShapeError),
    #[error("Decode failed: {0}")]
    Decode(ShapeError),
    #[error("Invalid declaration for {kind}: {reason}")]
    InvalidDeclaration { kind: String, reason: String },
    #[error("{kind} requires a sort key value")]
    MissingSortKey { kind: String },
    #[error("{kind} does not declare a sort key")]
    UnexpectedSortKey { kind: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for mapping operations.
pub type Result<T> = std::result::Result<T, MapperError>;
