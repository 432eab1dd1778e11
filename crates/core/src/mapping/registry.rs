//! Explicit registration of record kinds.
//!
//! Every mapper is declared against a [`Registry`], which numbers the
//! registrations and owns one [`PrefixAllocator`] per table. Prefixes are
//! therefore a function of the registration sequence alone.

use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;

use crate::shape::{Record, RecordShape};
use crate::storage::{KeyType, PARTITION_KEY_ATTR, SORT_KEY_ATTR};

use super::keys::PrefixRule;
use super::{
    Key, KeyRole, KeySpec, MapperError, PrefixAllocator, PrefixOrigin, RecordMapper, Result,
    TableSpec, KEY_SEPARATOR,
};

/// Holds the registration counter and per-table prefix allocations.
///
/// Registration is a setup-time activity and needs `&mut` access; share the
/// resulting mappers, not the registry.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    next_index: usize,
    allocators: HashMap<String, PrefixAllocator>,
}

/// A mapper together with the index it was registered under.
#[derive(Debug, Clone)]
pub struct Registration<T> {
    pub mapper: RecordMapper<T>,
    pub index: usize,
}

impl<T> Registration<T> {
    pub fn into_mapper(self) -> RecordMapper<T> {
        self.mapper
    }
}

/// Declaration of a mapper, finished by [`MapperBuilder::register`].
#[derive(Debug, Clone)]
pub struct MapperBuilder<T> {
    table: TableSpec,
    partition_key: Option<Key>,
    sort_key: Option<Key>,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> MapperBuilder<T> {
    pub(crate) fn new(table: &TableSpec) -> Self {
        Self {
            table: table.clone(),
            partition_key: None,
            sort_key: None,
            _record: PhantomData,
        }
    }

    /// Sets the partition key. Defaults to the shape's first field.
    pub fn partition_key(mut self, key: Key) -> Self {
        self.partition_key = Some(key);
        self
    }

    pub fn sort_key(mut self, key: Key) -> Self {
        self.sort_key = Some(key);
        self
    }

    pub fn register(self, registry: &mut Registry) -> Result<Registration<T>> {
        registry.register(self)
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful registrations so far.
    pub fn registered(&self) -> usize {
        self.next_index
    }

    /// The allocator state for `table`, if anything was registered on it.
    pub fn allocator(&self, table: &str) -> Option<&PrefixAllocator> {
        self.allocators.get(table)
    }

    /// Validates a declaration, resolves its keys and builds the mapper.
    ///
    /// A failed registration leaves the registry untouched.
    pub fn register<T: Record>(&mut self, builder: MapperBuilder<T>) -> Result<Registration<T>> {
        let shape = T::shape();
        check_shape(&shape)?;

        let table = builder.table;
        let index = self.next_index;
        let mut allocator = self
            .allocators
            .get(table.name())
            .cloned()
            .unwrap_or_default();

        let partition_decl = match builder.partition_key {
            Some(key) => key,
            None => {
                let first = shape
                    .first_field()
                    .ok_or_else(|| declaration_error(&shape, "shape declares no fields"))?;
                Key::field(first.name.clone())
            }
        };
        let partition_key = resolve(
            &shape,
            &table,
            KeyRole::Partition,
            &partition_decl,
            index,
            &mut allocator,
        )?;

        let sort_key = match &builder.sort_key {
            Some(decl) => Some(resolve(
                &shape,
                &table,
                KeyRole::Sort,
                decl,
                index,
                &mut allocator,
            )?),
            None => {
                if let Some(found) = table.sort_key_type().filter(|t| *t != KeyType::String) {
                    return Err(MapperError::TypeMismatch {
                        role: KeyRole::Sort,
                        expected: KeyType::String,
                        found,
                    });
                }
                None
            }
        };

        self.allocators.insert(table.name().to_string(), allocator);
        self.next_index += 1;

        tracing::debug!(
            kind = shape.kind(),
            table = table.name(),
            index,
            partition_prefix = partition_key.prefix().unwrap_or_default(),
            sort_prefix = sort_key.as_ref().and_then(KeySpec::prefix).unwrap_or_default(),
            "Registered record mapper"
        );

        Ok(Registration {
            mapper: RecordMapper::from_parts(shape, table, partition_key, sort_key, index),
            index,
        })
    }
}

fn check_shape(shape: &RecordShape) -> Result<()> {
    let mut seen = HashSet::new();
    for field in shape.fields() {
        if field.name == PARTITION_KEY_ATTR || field.name == SORT_KEY_ATTR {
            return Err(declaration_error(
                shape,
                &format!("field name '{}' is reserved for the table key", field.name),
            ));
        }
        if !seen.insert(field.name.as_str()) {
            return Err(declaration_error(
                shape,
                &format!("field '{}' is declared twice", field.name),
            ));
        }
    }
    Ok(())
}

fn resolve(
    shape: &RecordShape,
    table: &TableSpec,
    role: KeyRole,
    decl: &Key,
    index: usize,
    allocator: &mut PrefixAllocator,
) -> Result<KeySpec> {
    let field = shape.field(&decl.field).ok_or_else(|| {
        declaration_error(
            shape,
            &format!("the record does not have the field '{}'", decl.field),
        )
    })?;
    if field.optional {
        return Err(declaration_error(
            shape,
            &format!("the field '{}' cannot be optional when used as a key", decl.field),
        ));
    }
    let key_type = table.resolve_key_type(role).ok_or_else(|| {
        declaration_error(
            shape,
            &format!("table '{}' has no sort key", table.name()),
        )
    })?;
    let field_type = field.field_type.native_type();

    let mismatch = |expected, found| MapperError::TypeMismatch {
        role,
        expected,
        found,
    };
    if decl.rule == PrefixRule::Unprefixed {
        if field_type != key_type {
            return Err(mismatch(key_type, field_type));
        }
    } else {
        if key_type != KeyType::String {
            return Err(mismatch(KeyType::String, key_type));
        }
        if field_type == KeyType::Binary {
            return Err(mismatch(KeyType::String, field_type));
        }
    }

    let (prefix, origin) = match &decl.rule {
        PrefixRule::Allocate => (
            Some(allocator.allocate(shape.kind(), &decl.field, role, index)?),
            PrefixOrigin::Allocated,
        ),
        PrefixRule::Literal(prefix) => {
            if prefix.is_empty() || prefix.contains(KEY_SEPARATOR) {
                return Err(declaration_error(
                    shape,
                    &format!("prefix {prefix:?} must be non-empty and free of '{KEY_SEPARATOR}'"),
                ));
            }
            if !allocator.claim(shape.kind(), &decl.field, role, prefix) {
                return Err(declaration_error(
                    shape,
                    &format!(
                        "{role} key prefix {prefix:?} is already in use on table '{}'",
                        table.name()
                    ),
                ));
            }
            (Some(prefix.clone()), PrefixOrigin::Explicit)
        }
        PrefixRule::Inherit(prefix) => (Some(prefix.clone()), PrefixOrigin::Inherited),
        PrefixRule::Unprefixed => (None, PrefixOrigin::Unprefixed),
    };

    Ok(KeySpec {
        role,
        field: decl.field.clone(),
        prefix,
        origin,
        field_type,
        key_type,
    })
}

fn declaration_error(shape: &RecordShape, reason: &str) -> MapperError {
    MapperError::InvalidDeclaration {
        kind: shape.kind().to_string(),
        reason: reason.to_string(),
    }
}
