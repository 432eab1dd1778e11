use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::storage::KeyType;

/// The declared type of one record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    /// Stored in canonical hyphenated lowercase form.
    Uuid,
    /// ISO-8601 date and time, RFC 3339 when an offset is present.
    DateTime,
    /// ISO-8601 calendar date (`YYYY-MM-DD`).
    Date,
    Binary,
    /// A closed set of string values.
    Enum(&'static [&'static str]),
}

impl FieldType {
    /// The native type values of this field are stored as.
    pub fn native_type(&self) -> KeyType {
        match self {
            FieldType::Integer | FieldType::Float => KeyType::Number,
            FieldType::Binary => KeyType::Binary,
            _ => KeyType::String,
        }
    }

    pub(crate) fn describe(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Boolean => "boolean",
            FieldType::Uuid => "uuid",
            FieldType::DateTime => "datetime",
            FieldType::Date => "date",
            FieldType::Binary => "binary",
            FieldType::Enum(_) => "enum",
        }
    }
}

/// One declared field of a [`RecordShape`].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    /// Position of the field in declaration order.
    pub index: usize,
    pub field_type: FieldType,
    pub optional: bool,
    /// Value used when the stored item lacks this field.
    pub default: Option<Value>,
}

/// The explicit schema of one record kind: field names, order, types,
/// optionality and defaults.
///
/// Shapes are built once per kind and handed to the mapper at declaration
/// time; nothing is introspected per call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordShape {
    kind: String,
    fields: Vec<FieldSpec>,
}

impl RecordShape {
    /// Starts declaring the shape of the record kind named `kind`.
    pub fn builder(kind: impl Into<String>) -> RecordShapeBuilder {
        RecordShapeBuilder {
            kind: kind.into(),
            fields: Vec::new(),
        }
    }

    /// The record kind name. Prefix allocation is derived from it.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The first declared field, the partition key source when none is given.
    pub fn first_field(&self) -> Option<&FieldSpec> {
        self.fields.first()
    }
}

/// Builder for [`RecordShape`]. Fields are indexed in the order they are added.
#[derive(Debug, Clone)]
pub struct RecordShapeBuilder {
    kind: String,
    fields: Vec<FieldSpec>,
}

impl RecordShapeBuilder {
    /// Declares a required field.
    pub fn field(self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.push(name.into(), field_type, false, None)
    }

    /// Declares a field that may be absent (`Option<_>` on the record).
    pub fn optional(self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.push(name.into(), field_type, true, None)
    }

    /// Declares a field that takes `default` when missing from a stored item.
    pub fn with_default(
        self,
        name: impl Into<String>,
        field_type: FieldType,
        default: impl Into<Value>,
    ) -> Self {
        self.push(name.into(), field_type, false, Some(default.into()))
    }

    pub fn build(self) -> RecordShape {
        RecordShape {
            kind: self.kind,
            fields: self.fields,
        }
    }

    fn push(
        mut self,
        name: String,
        field_type: FieldType,
        optional: bool,
        default: Option<Value>,
    ) -> Self {
        let index = self.fields.len();
        self.fields.push(FieldSpec {
            name,
            index,
            field_type,
            optional,
            default,
        });
        self
    }
}

/// A typed record that can be mapped onto a table.
///
/// The serde representation must be a map whose keys are exactly the
/// fields declared by [`Record::shape`].
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    fn shape() -> RecordShape;
}
