use std::collections::HashMap;
use std::fmt;

use uuid::Uuid;

/// Name of the partition key attribute on every stored item.
pub const PARTITION_KEY_ATTR: &str = "pk";

/// Name of the sort key attribute on every stored item.
pub const SORT_KEY_ATTR: &str = "sk";

/// An attribute map as exchanged with the store.
pub type Item = HashMap<String, NativeValue>;

/// A scalar in the store's native encoding.
///
/// Numbers are carried as decimal text so that no precision is lost between
/// the record and the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NativeValue {
    S(String),
    N(String),
    B(Vec<u8>),
}

impl NativeValue {
    /// The primitive type this value is stored as.
    pub fn key_type(&self) -> KeyType {
        match self {
            NativeValue::S(_) => KeyType::String,
            NativeValue::N(_) => KeyType::Number,
            NativeValue::B(_) => KeyType::Binary,
        }
    }

    pub fn as_s(&self) -> Option<&str> {
        match self {
            NativeValue::S(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_n(&self) -> Option<&str> {
        match self {
            NativeValue::N(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_b(&self) -> Option<&[u8]> {
        match self {
            NativeValue::B(b) => Some(b),
            _ => None,
        }
    }

    /// Text used when the value is embedded in a prefixed key.
    ///
    /// Binary values have no text form and return `None`.
    pub fn key_text(&self) -> Option<&str> {
        match self {
            NativeValue::S(s) | NativeValue::N(s) => Some(s),
            NativeValue::B(_) => None,
        }
    }
}

impl fmt::Display for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeValue::S(s) => write!(f, "S({s})"),
            NativeValue::N(n) => write!(f, "N({n})"),
            NativeValue::B(b) => write!(f, "B({} bytes)", b.len()),
        }
    }
}

impl From<&str> for NativeValue {
    fn from(value: &str) -> Self {
        NativeValue::S(value.to_string())
    }
}

impl From<String> for NativeValue {
    fn from(value: String) -> Self {
        NativeValue::S(value)
    }
}

impl From<Uuid> for NativeValue {
    fn from(value: Uuid) -> Self {
        NativeValue::S(value.hyphenated().to_string())
    }
}

impl From<Vec<u8>> for NativeValue {
    fn from(value: Vec<u8>) -> Self {
        NativeValue::B(value)
    }
}

impl From<&[u8]> for NativeValue {
    fn from(value: &[u8]) -> Self {
        NativeValue::B(value.to_vec())
    }
}

macro_rules! number_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for NativeValue {
                fn from(value: $t) -> Self {
                    NativeValue::N(value.to_string())
                }
            }
        )*
    };
}

number_from!(i8, i16, i32, i64, u8, u16, u32, u64);

/// The primitive types a table may declare for its keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    String,
    Number,
    Binary,
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyType::String => f.write_str("string"),
            KeyType::Number => f.write_str("number"),
            KeyType::Binary => f.write_str("binary"),
        }
    }
}
