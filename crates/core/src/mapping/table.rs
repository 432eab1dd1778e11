use crate::storage::{KeyType, NativeValue};

use super::{KeyRole, MapperError, Result};

/// The physical table a record kind is mapped onto.
///
/// Only the name and the primitive types of the keys are declared here; the
/// key attributes themselves are always named `pk` and `sk`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableSpec {
    name: String,
    partition_key: KeyType,
    sort_key: Option<KeyType>,
}

impl TableSpec {
    /// A table with a string partition key and no sort key.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            partition_key: KeyType::String,
            sort_key: None,
        }
    }

    pub fn with_partition_key(mut self, key_type: KeyType) -> Self {
        self.partition_key = key_type;
        self
    }

    pub fn with_sort_key(mut self, key_type: KeyType) -> Self {
        self.sort_key = Some(key_type);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn partition_key_type(&self) -> KeyType {
        self.partition_key
    }

    pub fn sort_key_type(&self) -> Option<KeyType> {
        self.sort_key
    }

    pub fn has_sort_key(&self) -> bool {
        self.sort_key.is_some()
    }

    /// The declared type for `role`, or `None` for the sort role of a table
    /// without a sort key.
    pub fn resolve_key_type(&self, role: KeyRole) -> Option<KeyType> {
        match role {
            KeyRole::Partition => Some(self.partition_key),
            KeyRole::Sort => self.sort_key,
        }
    }

    /// Checks that `value` is stored as the type declared for `role`.
    pub fn validate_value(&self, role: KeyRole, value: &NativeValue) -> Result<()> {
        let Some(expected) = self.resolve_key_type(role) else {
            return Err(MapperError::InvalidDeclaration {
                kind: self.name.clone(),
                reason: "table has no sort key".to_string(),
            });
        };
        if value.key_type() != expected {
            return Err(MapperError::TypeMismatch {
                role,
                expected,
                found: value.key_type(),
            });
        }
        Ok(())
    }
}
