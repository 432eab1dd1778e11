//! DynamoDB attribute conversion functions.
//!
//! Pure functions for converting between DynamoDB AttributeValue maps and
//! native item maps. These are testable in isolation without DynamoDB access.

use std::collections::HashMap;

use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::AttributeValue;
use dynamo_items_core::storage::{Item, NativeValue, StoreError};

/// Convert a native value to a DynamoDB attribute.
pub fn to_attribute_value(value: NativeValue) -> AttributeValue {
    match value {
        NativeValue::S(s) => AttributeValue::S(s),
        NativeValue::N(n) => AttributeValue::N(n),
        NativeValue::B(b) => AttributeValue::B(Blob::new(b)),
    }
}

/// Convert a DynamoDB attribute to a native value.
///
/// Only scalar string, number and binary attributes have a native form.
pub fn from_attribute_value(name: &str, value: AttributeValue) -> Result<NativeValue, StoreError> {
    match value {
        AttributeValue::S(s) => Ok(NativeValue::S(s)),
        AttributeValue::N(n) => Ok(NativeValue::N(n)),
        AttributeValue::B(b) => Ok(NativeValue::B(b.into_inner())),
        other => {
            tracing::warn!(attribute = name, value = ?other, "Unsupported DynamoDB attribute");
            Err(StoreError::UnsupportedAttribute {
                name: name.to_string(),
                reason: format!("{} attributes are not supported", attribute_kind(&other)),
            })
        }
    }
}

/// Convert a native item to a DynamoDB item.
pub fn to_attribute_map(item: Item) -> HashMap<String, AttributeValue> {
    item.into_iter()
        .map(|(name, value)| (name, to_attribute_value(value)))
        .collect()
}

/// Convert a DynamoDB item to a native item.
pub fn from_attribute_map(item: HashMap<String, AttributeValue>) -> Result<Item, StoreError> {
    item.into_iter()
        .map(|(name, value)| {
            let value = from_attribute_value(&name, value)?;
            Ok((name, value))
        })
        .collect()
}

fn attribute_kind(value: &AttributeValue) -> &'static str {
    match value {
        AttributeValue::Bool(_) => "BOOL",
        AttributeValue::Null(_) => "NULL",
        AttributeValue::L(_) => "L",
        AttributeValue::M(_) => "M",
        AttributeValue::Ss(_) => "SS",
        AttributeValue::Ns(_) => "NS",
        AttributeValue::Bs(_) => "BS",
        _ => "unknown",
    }
}
