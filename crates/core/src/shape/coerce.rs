//! Conversion between a record's serde representation and stored attributes.
//!
//! Encoding checks every declared field before anything is written; decoding
//! coerces native values back to the declared field types.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value};
use uuid::Uuid;

use crate::storage::{Item, NativeValue};

use super::{FieldSpec, FieldType, RecordShape, ShapeError};

const DATE_FORMAT: &str = "%Y-%m-%d";
const NAIVE_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

impl RecordShape {
    /// Checks a serialized record against the shape and encodes each declared
    /// field to its native value.
    ///
    /// Optional fields that are `null` are left out of the item.
    pub fn encode(&self, record: &Value) -> Result<Item, ShapeError> {
        let Value::Object(map) = record else {
            return Err(ShapeError::NotAMap {
                kind: self.kind().to_string(),
                found: json_kind(record).to_string(),
            });
        };

        if let Some(name) = map.keys().find(|name| self.field(name).is_none()) {
            return Err(ShapeError::UndeclaredField {
                kind: self.kind().to_string(),
                field: name.clone(),
            });
        }

        let mut item = Item::new();
        for spec in self.fields() {
            let value = match (map.get(&spec.name), &spec.default) {
                (None | Some(Value::Null), _) if spec.optional => continue,
                (None, Some(default)) => default,
                (None | Some(Value::Null), _) => return Err(self.missing(spec)),
                (Some(value), _) => value,
            };
            item.insert(spec.name.clone(), self.encode_field(spec, value)?);
        }
        Ok(item)
    }

    /// Validates a stored attribute map and coerces it into the record's
    /// serde representation.
    ///
    /// Missing fields take their declared default, missing optional fields
    /// become `null`, and attributes the shape does not declare are ignored.
    pub fn validate_and_coerce(&self, item: &Item) -> Result<Value, ShapeError> {
        let mut map = Map::with_capacity(self.fields().len());
        for spec in self.fields() {
            let value = match item.get(&spec.name) {
                Some(native) => self.decode_field(spec, native)?,
                None => match &spec.default {
                    Some(default) => default.clone(),
                    None if spec.optional => Value::Null,
                    None => return Err(self.missing(spec)),
                },
            };
            map.insert(spec.name.clone(), value);
        }
        Ok(Value::Object(map))
    }

    /// Rewrites a raw key value for `field` into the form records are
    /// stored with, so equal values in different notations address the same
    /// item.
    ///
    /// UUIDs become lowercase hyphenated, datetimes with an offset become UTC
    /// with a `Z` suffix, dates and integers are reformatted. Values of any
    /// other type, or of the wrong native type, pass through unchanged.
    pub fn canonical_key(&self, field: &str, raw: NativeValue) -> Result<NativeValue, ShapeError> {
        let Some(spec) = self.field(field) else {
            return Ok(raw);
        };

        match (spec.field_type, raw) {
            (FieldType::Uuid, NativeValue::S(s)) => Uuid::parse_str(&s)
                .map(|id| NativeValue::S(id.hyphenated().to_string()))
                .map_err(|e| self.invalid(spec, format!("invalid uuid {s:?}: {e}"))),
            (FieldType::DateTime, NativeValue::S(s)) => canonical_datetime(&s)
                .map(NativeValue::S)
                .ok_or_else(|| self.invalid(spec, format!("invalid datetime {s:?}"))),
            (FieldType::Date, NativeValue::S(s)) => NaiveDate::parse_from_str(&s, DATE_FORMAT)
                .map(|date| NativeValue::S(date.format(DATE_FORMAT).to_string()))
                .map_err(|e| self.invalid(spec, format!("invalid date {s:?}: {e}"))),
            (FieldType::Integer, NativeValue::N(n)) => n
                .trim()
                .parse::<i128>()
                .map(|i| NativeValue::N(i.to_string()))
                .map_err(|_| self.invalid(spec, format!("{n:?} is not an integer"))),
            (_, raw) => Ok(raw),
        }
    }

    fn encode_field(&self, spec: &FieldSpec, value: &Value) -> Result<NativeValue, ShapeError> {
        let wrong_type = || self.wrong_type(spec, json_kind(value));

        match (spec.field_type, value) {
            (FieldType::String, Value::String(s)) => Ok(NativeValue::S(s.clone())),
            (FieldType::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => {
                Ok(NativeValue::N(n.to_string()))
            }
            (FieldType::Float, Value::Number(n)) => Ok(NativeValue::N(n.to_string())),
            (FieldType::Boolean, Value::Bool(b)) => Ok(NativeValue::S(b.to_string())),
            (FieldType::Uuid, Value::String(s)) => Uuid::parse_str(s)
                .map(|id| NativeValue::S(id.hyphenated().to_string()))
                .map_err(|e| self.invalid(spec, format!("invalid uuid {s:?}: {e}"))),
            (FieldType::DateTime, Value::String(s)) => {
                if is_datetime(s) {
                    Ok(NativeValue::S(s.clone()))
                } else {
                    Err(self.invalid(spec, format!("invalid datetime {s:?}")))
                }
            }
            (FieldType::Date, Value::String(s)) => NaiveDate::parse_from_str(s, DATE_FORMAT)
                .map(|_| NativeValue::S(s.clone()))
                .map_err(|e| self.invalid(spec, format!("invalid date {s:?}: {e}"))),
            (FieldType::Binary, Value::Array(values)) => values
                .iter()
                .map(|v| v.as_u64().and_then(|b| u8::try_from(b).ok()))
                .collect::<Option<Vec<u8>>>()
                .map(NativeValue::B)
                .ok_or_else(|| self.invalid(spec, "binary values must be bytes".to_string())),
            (FieldType::Enum(members), Value::String(s)) => {
                if members.contains(&s.as_str()) {
                    Ok(NativeValue::S(s.clone()))
                } else {
                    Err(self.unknown_variant(spec, s, members))
                }
            }
            _ => Err(wrong_type()),
        }
    }

    fn decode_field(&self, spec: &FieldSpec, native: &NativeValue) -> Result<Value, ShapeError> {
        match (spec.field_type, native) {
            (FieldType::String, NativeValue::S(s)) => Ok(Value::String(s.clone())),
            (FieldType::Integer, NativeValue::N(n)) => n
                .parse::<i64>()
                .map(Value::from)
                .or_else(|_| n.parse::<u64>().map(Value::from))
                .map_err(|_| self.invalid(spec, format!("{n:?} is not an integer"))),
            (FieldType::Float, NativeValue::N(n)) => n
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| self.invalid(spec, format!("{n:?} is not a finite number"))),
            (FieldType::Boolean, NativeValue::S(s)) => match s.as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(self.invalid(spec, format!("{s:?} is not a boolean"))),
            },
            (FieldType::Uuid, NativeValue::S(s)) => Uuid::parse_str(s)
                .map(|id| Value::String(id.hyphenated().to_string()))
                .map_err(|e| self.invalid(spec, format!("invalid uuid {s:?}: {e}"))),
            (FieldType::DateTime, NativeValue::S(s)) => {
                if is_datetime(s) {
                    Ok(Value::String(s.clone()))
                } else {
                    Err(self.invalid(spec, format!("invalid datetime {s:?}")))
                }
            }
            (FieldType::Date, NativeValue::S(s)) => NaiveDate::parse_from_str(s, DATE_FORMAT)
                .map(|_| Value::String(s.clone()))
                .map_err(|e| self.invalid(spec, format!("invalid date {s:?}: {e}"))),
            (FieldType::Binary, NativeValue::B(bytes)) => {
                Ok(Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()))
            }
            (FieldType::Enum(members), NativeValue::S(s)) => {
                if members.contains(&s.as_str()) {
                    Ok(Value::String(s.clone()))
                } else {
                    Err(self.unknown_variant(spec, s, members))
                }
            }
            (_, other) => Err(self.wrong_type(spec, &other.key_type().to_string())),
        }
    }

    fn missing(&self, spec: &FieldSpec) -> ShapeError {
        ShapeError::MissingField {
            kind: self.kind().to_string(),
            field: spec.name.clone(),
        }
    }

    fn wrong_type(&self, spec: &FieldSpec, found: &str) -> ShapeError {
        ShapeError::WrongType {
            kind: self.kind().to_string(),
            field: spec.name.clone(),
            expected: spec.field_type.describe().to_string(),
            found: found.to_string(),
        }
    }

    fn invalid(&self, spec: &FieldSpec, reason: String) -> ShapeError {
        ShapeError::InvalidValue {
            kind: self.kind().to_string(),
            field: spec.name.clone(),
            reason,
        }
    }

    fn unknown_variant(&self, spec: &FieldSpec, value: &str, members: &[&str]) -> ShapeError {
        ShapeError::UnknownVariant {
            kind: self.kind().to_string(),
            field: spec.name.clone(),
            value: value.to_string(),
            members: members.iter().map(|m| m.to_string()).collect(),
        }
    }
}

fn is_datetime(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok()
        || NaiveDateTime::parse_from_str(s, NAIVE_DATETIME_FORMAT).is_ok()
}

fn canonical_datetime(s: &str) -> Option<String> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(s) {
        return Some(
            instant
                .with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::AutoSi, true),
        );
    }
    NaiveDateTime::parse_from_str(s, NAIVE_DATETIME_FORMAT)
        .ok()
        .map(|naive| naive.format(NAIVE_DATETIME_FORMAT).to_string())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
