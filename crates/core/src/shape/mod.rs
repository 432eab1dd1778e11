mod coerce;
mod error;
mod types;

pub use error::ShapeError;
pub use types::{FieldSpec, FieldType, Record, RecordShape, RecordShapeBuilder};
