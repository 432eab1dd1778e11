use thiserror::Error;

/// Field-level diagnostics produced while checking a record against its shape.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShapeError {
    #[error("{kind}.{field}: missing required field")]
    MissingField { kind: String, field: String },
    #[error("{kind}.{field}: expected {expected}, found {found}")]
    WrongType {
        kind: String,
        field: String,
        expected: String,
        found: String,
    },
    #[error("{kind}.{field}: {value:?} is not one of {members:?}")]
    UnknownVariant {
        kind: String,
        field: String,
        value: String,
        members: Vec<String>,
    },
    #[error("{kind}.{field}: {reason}")]
    InvalidValue {
        kind: String,
        field: String,
        reason: String,
    },
    #[error("{kind}.{field}: field is not declared on the shape")]
    UndeclaredField { kind: String, field: String },
    #[error("{kind}: record must serialize to a map, found {found}")]
    NotAMap { kind: String, found: String },
    #[error("{kind}: {reason}")]
    Serde { kind: String, reason: String },
}
