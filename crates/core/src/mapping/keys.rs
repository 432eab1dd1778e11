//! Key declarations and their resolved, per-mapper form.
//!
//! A prefixed key is stored as `<prefix>#<value>`. Putting the prefix first
//! keeps every item of one kind (or one item collection, when a prefix is
//! inherited) contiguous under the store's lexicographic key order.

use std::fmt;

use crate::storage::{KeyType, NativeValue};

use super::{MapperError, Result};

/// Separator between a key prefix and the key value.
pub const KEY_SEPARATOR: &str = "#";

/// Which component of the composite primary key a key fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyRole {
    Partition,
    Sort,
}

impl fmt::Display for KeyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyRole::Partition => f.write_str("partition"),
            KeyRole::Sort => f.write_str("sort"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PrefixRule {
    Allocate,
    Literal(String),
    Inherit(String),
    Unprefixed,
}

/// A key declaration: which record field supplies the value and how the
/// prefix is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    pub(crate) field: String,
    pub(crate) rule: PrefixRule,
}

impl Key {
    /// Key sourced from `field`, with a prefix allocated at registration.
    pub fn field(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            rule: PrefixRule::Allocate,
        }
    }

    /// Key sourced from `field`, storing the raw value in the table's native
    /// key type with no prefix.
    pub fn unprefixed(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            rule: PrefixRule::Unprefixed,
        }
    }

    /// Key sourced from `field` that reuses the prefix of an already
    /// registered key, placing both kinds in the same item collection.
    pub fn inherit(field: impl Into<String>, from: &KeySpec) -> Self {
        let rule = match from.prefix() {
            Some(prefix) => PrefixRule::Inherit(prefix.to_string()),
            None => PrefixRule::Unprefixed,
        };
        Self {
            field: field.into(),
            rule,
        }
    }

    /// Uses `prefix` verbatim instead of allocating one.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.rule = PrefixRule::Literal(prefix.into());
        self
    }

    pub fn field_name(&self) -> &str {
        &self.field
    }
}

/// How a resolved key obtained its prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOrigin {
    Allocated,
    Explicit,
    Inherited,
    Unprefixed,
}

impl fmt::Display for PrefixOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrefixOrigin::Allocated => f.write_str("allocated"),
            PrefixOrigin::Explicit => f.write_str("explicit"),
            PrefixOrigin::Inherited => f.write_str("inherited"),
            PrefixOrigin::Unprefixed => f.write_str("unprefixed"),
        }
    }
}

/// A key bound to one role of one registered record kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpec {
    pub(crate) role: KeyRole,
    pub(crate) field: String,
    pub(crate) prefix: Option<String>,
    pub(crate) origin: PrefixOrigin,
    /// Native type of the source field.
    pub(crate) field_type: KeyType,
    /// Type the table declares for this role.
    pub(crate) key_type: KeyType,
}

impl KeySpec {
    pub fn role(&self) -> KeyRole {
        self.role
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn origin(&self) -> PrefixOrigin {
        self.origin
    }

    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Composes `<prefix>#<value>`. Unprefixed keys return `value` unchanged.
    pub fn format(&self, value: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}{KEY_SEPARATOR}{value}"),
            None => value.to_string(),
        }
    }

    /// Splits a stored key into its prefix and raw value.
    pub fn parse<'a>(&self, stored: &'a str) -> Result<(&'a str, &'a str)> {
        let Some(prefix) = self.prefix.as_deref() else {
            return Ok(("", stored));
        };
        stored
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix(KEY_SEPARATOR))
            .map(|raw| (&stored[..prefix.len()], raw))
            .ok_or_else(|| self.format_error(stored))
    }

    /// Turns a raw key value into the value stored in the key attribute.
    ///
    /// The raw value must have the native type of the source field, and an
    /// unprefixed key must also match the table's declared type.
    pub fn encode(&self, raw: &NativeValue) -> Result<NativeValue> {
        self.check_type(self.field_type, raw)?;
        match (&self.prefix, raw.key_text()) {
            (Some(_), Some(text)) => Ok(NativeValue::S(self.format(text))),
            (Some(_), None) => Err(self.mismatch(KeyType::String, raw.key_type())),
            (None, _) => {
                self.check_type(self.key_type, raw)?;
                Ok(raw.clone())
            }
        }
    }

    /// Recovers the raw key value from a stored key attribute.
    pub fn decode(&self, stored: &NativeValue) -> Result<NativeValue> {
        if self.prefix.is_none() {
            if stored.key_type() != self.key_type {
                return Err(self.format_error(&stored.to_string()));
            }
            return Ok(stored.clone());
        }

        let Some(text) = stored.as_s() else {
            return Err(self.format_error(&stored.to_string()));
        };
        let (_, raw) = self.parse(text)?;
        Ok(match self.field_type {
            KeyType::Number => NativeValue::N(raw.to_string()),
            _ => NativeValue::S(raw.to_string()),
        })
    }

    fn check_type(&self, expected: KeyType, raw: &NativeValue) -> Result<()> {
        if raw.key_type() == expected {
            Ok(())
        } else {
            Err(self.mismatch(expected, raw.key_type()))
        }
    }

    fn mismatch(&self, expected: KeyType, found: KeyType) -> MapperError {
        MapperError::TypeMismatch {
            role: self.role,
            expected,
            found,
        }
    }

    fn format_error(&self, stored: &str) -> MapperError {
        MapperError::KeyFormat {
            role: self.role,
            key: stored.to_string(),
            expected: self.format(""),
        }
    }
}
