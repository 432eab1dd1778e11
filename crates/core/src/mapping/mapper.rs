//! Forward and reverse mapping between typed records and stored items.

use std::fmt;
use std::marker::PhantomData;

use crate::shape::{Record, RecordShape, ShapeError};
use crate::storage::{Item, ItemStore, NativeValue, PARTITION_KEY_ATTR, SORT_KEY_ATTR};

use super::registry::MapperBuilder;
use super::{KeyRole, KeySpec, MapperError, Result, TableSpec};

/// Sort key written for kinds without a sort key on tables that require one.
///
/// Kinds relying on it must not share a partition prefix with each other,
/// since they would all land on the same `(pk, "A")` item.
pub const ASSUMED_SORT_KEY: &str = "A";

/// Maps one record kind onto one table.
///
/// A mapper is immutable once registered and holds no per-record state; it
/// can be shared freely and used concurrently.
pub struct RecordMapper<T> {
    shape: RecordShape,
    table: TableSpec,
    partition_key: KeySpec,
    sort_key: Option<KeySpec>,
    registration_index: usize,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for RecordMapper<T> {
    fn clone(&self) -> Self {
        Self {
            shape: self.shape.clone(),
            table: self.table.clone(),
            partition_key: self.partition_key.clone(),
            sort_key: self.sort_key.clone(),
            registration_index: self.registration_index,
            _record: PhantomData,
        }
    }
}

impl<T> fmt::Debug for RecordMapper<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordMapper")
            .field("kind", &self.shape.kind())
            .field("table", &self.table.name())
            .field("partition_key", &self.partition_key)
            .field("sort_key", &self.sort_key)
            .field("registration_index", &self.registration_index)
            .finish()
    }
}

impl<T> RecordMapper<T> {
    pub(crate) fn from_parts(
        shape: RecordShape,
        table: TableSpec,
        partition_key: KeySpec,
        sort_key: Option<KeySpec>,
        registration_index: usize,
    ) -> Self {
        Self {
            shape,
            table,
            partition_key,
            sort_key,
            registration_index,
            _record: PhantomData,
        }
    }

    pub fn shape(&self) -> &RecordShape {
        &self.shape
    }

    pub fn table(&self) -> &TableSpec {
        &self.table
    }

    pub fn partition_key(&self) -> &KeySpec {
        &self.partition_key
    }

    pub fn sort_key(&self) -> Option<&KeySpec> {
        self.sort_key.as_ref()
    }

    pub fn registration_index(&self) -> usize {
        self.registration_index
    }

    /// Builds the stored key for raw partition and sort values.
    ///
    /// Values are first brought into the notation records are stored with,
    /// so an uppercase UUID or a datetime with an offset finds the same item.
    /// Fails with [`MapperError::TypeMismatch`] before anything reaches the
    /// store when a value has the wrong native type.
    pub fn key(&self, pk: NativeValue, sk: Option<NativeValue>) -> Result<Item> {
        let mut key = Item::with_capacity(2);

        let pk = self.canonical_key(&self.partition_key, pk)?;
        let partition = self.partition_key.encode(&pk)?;
        self.table.validate_value(KeyRole::Partition, &partition)?;
        key.insert(PARTITION_KEY_ATTR.to_string(), partition);

        let sort = match (&self.sort_key, sk) {
            (Some(spec), Some(raw)) => Some(spec.encode(&self.canonical_key(spec, raw)?)?),
            (Some(_), None) => {
                return Err(MapperError::MissingSortKey {
                    kind: self.shape.kind().to_string(),
                })
            }
            (None, Some(_)) => {
                return Err(MapperError::UnexpectedSortKey {
                    kind: self.shape.kind().to_string(),
                })
            }
            (None, None) if self.table.has_sort_key() => {
                Some(NativeValue::S(ASSUMED_SORT_KEY.to_string()))
            }
            (None, None) => None,
        };
        if let Some(sort) = sort {
            self.table.validate_value(KeyRole::Sort, &sort)?;
            key.insert(SORT_KEY_ATTR.to_string(), sort);
        }

        Ok(key)
    }

    fn canonical_key(&self, spec: &KeySpec, raw: NativeValue) -> Result<NativeValue> {
        self.shape
            .canonical_key(&spec.field, raw)
            .map_err(MapperError::Validation)
    }
}

impl<T: Record> RecordMapper<T> {
    /// Starts declaring a mapper for `T` on `table`.
    pub fn builder(table: &TableSpec) -> MapperBuilder<T> {
        MapperBuilder::new(table)
    }

    /// The raw partition and sort values of `record`, as accepted by
    /// [`RecordMapper::get_item`].
    pub fn raw_keys(&self, record: &T) -> Result<(NativeValue, Option<NativeValue>)> {
        let item = self.encode_fields(record)?;
        let pk = self.key_field(&item, &self.partition_key)?;
        let sk = match &self.sort_key {
            Some(spec) => Some(self.key_field(&item, spec)?),
            None => None,
        };
        Ok((pk, sk))
    }

    /// Forward mapping: the full item written for `record`.
    pub fn to_item(&self, record: &T) -> Result<Item> {
        let mut item = self.encode_fields(record)?;
        let pk = self.key_field(&item, &self.partition_key)?;
        let sk = match &self.sort_key {
            Some(spec) => Some(self.key_field(&item, spec)?),
            None => None,
        };
        item.extend(self.key(pk, sk)?);
        Ok(item)
    }

    /// Reverse mapping: rebuilds a record from a stored item.
    ///
    /// The stored keys must parse under this mapper's prefixes. A key's source
    /// field is read from its own attribute and only recovered from the key
    /// when that attribute is missing.
    pub fn from_item(&self, mut item: Item) -> Result<T> {
        let pk = item
            .remove(PARTITION_KEY_ATTR)
            .ok_or_else(|| self.missing_attr(PARTITION_KEY_ATTR))?;
        let raw = self.partition_key.decode(&pk)?;
        item.entry(self.partition_key.field.clone()).or_insert(raw);

        let sk = item.remove(SORT_KEY_ATTR);
        match (&self.sort_key, sk) {
            (Some(spec), Some(stored)) => {
                let raw = spec.decode(&stored)?;
                item.entry(spec.field.clone()).or_insert(raw);
            }
            (Some(_), None) => return Err(self.missing_attr(SORT_KEY_ATTR)),
            (None, Some(stored)) => {
                if stored.as_s() != Some(ASSUMED_SORT_KEY) {
                    return Err(MapperError::KeyFormat {
                        role: KeyRole::Sort,
                        key: stored.to_string(),
                        expected: ASSUMED_SORT_KEY.to_string(),
                    });
                }
            }
            (None, None) if self.table.has_sort_key() => {
                return Err(self.missing_attr(SORT_KEY_ATTR))
            }
            (None, None) => {}
        }

        let value = self
            .shape
            .validate_and_coerce(&item)
            .map_err(MapperError::Decode)?;
        serde_json::from_value(value).map_err(|e| {
            MapperError::Decode(ShapeError::Serde {
                kind: self.shape.kind().to_string(),
                reason: e.to_string(),
            })
        })
    }

    /// Writes `record`. Nothing is written when the record fails validation.
    pub async fn put_item(&self, store: &dyn ItemStore, record: &T) -> Result<()> {
        let item = self.to_item(record)?;
        tracing::debug!(
            table = self.table.name(),
            kind = self.shape.kind(),
            pk = %item[PARTITION_KEY_ATTR],
            "Putting item"
        );
        store.put(self.table.name(), item).await?;
        Ok(())
    }

    /// Reads the record stored under the given raw key values.
    ///
    /// Returns `Ok(None)` when nothing is stored under the key.
    pub async fn get_item<P: Into<NativeValue>>(
        &self,
        store: &dyn ItemStore,
        pk: P,
        sk: Option<NativeValue>,
    ) -> Result<Option<T>> {
        let key = self.key(pk.into(), sk)?;
        tracing::debug!(
            table = self.table.name(),
            kind = self.shape.kind(),
            pk = %key[PARTITION_KEY_ATTR],
            "Getting item"
        );
        match store.get(self.table.name(), key).await? {
            Some(item) => self.from_item(item).map(Some),
            None => Ok(None),
        }
    }

    /// Removes the record stored under the given raw key values.
    pub async fn delete_item<P: Into<NativeValue>>(
        &self,
        store: &dyn ItemStore,
        pk: P,
        sk: Option<NativeValue>,
    ) -> Result<()> {
        let key = self.key(pk.into(), sk)?;
        tracing::debug!(
            table = self.table.name(),
            kind = self.shape.kind(),
            pk = %key[PARTITION_KEY_ATTR],
            "Deleting item"
        );
        store.delete(self.table.name(), key).await?;
        Ok(())
    }

    fn encode_fields(&self, record: &T) -> Result<Item> {
        let value = serde_json::to_value(record).map_err(|e| {
            MapperError::Validation(ShapeError::Serde {
                kind: self.shape.kind().to_string(),
                reason: e.to_string(),
            })
        })?;
        self.shape.encode(&value).map_err(MapperError::Validation)
    }

    fn key_field(&self, item: &Item, spec: &KeySpec) -> Result<NativeValue> {
        item.get(&spec.field).cloned().ok_or_else(|| {
            MapperError::Validation(ShapeError::MissingField {
                kind: self.shape.kind().to_string(),
                field: spec.field.clone(),
            })
        })
    }

    fn missing_attr(&self, attr: &str) -> MapperError {
        MapperError::Decode(ShapeError::MissingField {
            kind: self.shape.kind().to_string(),
            field: attr.to_string(),
        })
    }
}
