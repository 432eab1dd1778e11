use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::shape::{FieldType, Record, RecordShape, ShapeError};
use crate::storage::{
    Item, ItemStore, KeyType, NativeValue, StoreError, PARTITION_KEY_ATTR, SORT_KEY_ATTR,
};

use super::*;

const STATUS: &[&str] = &["pending", "failed", "complete"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Status {
    #[default]
    Pending,
    Failed,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Command {
    command_id: Uuid,
    status: Status,
    retry: i64,
}

impl Command {
    fn new(command_id: Uuid) -> Self {
        Self {
            command_id,
            status: Status::Pending,
            retry: 0,
        }
    }
}

impl Record for Command {
    fn shape() -> RecordShape {
        RecordShape::builder("Command")
            .field("command_id", FieldType::Uuid)
            .with_default("status", FieldType::Enum(STATUS), "pending")
            .with_default("retry", FieldType::Integer, 0)
            .build()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CommandV2 {
    device_id: String,
    command_id: Uuid,
    status: Status,
}

impl Record for CommandV2 {
    fn shape() -> RecordShape {
        RecordShape::builder("CommandV2")
            .field("device_id", FieldType::String)
            .field("command_id", FieldType::Uuid)
            .with_default("status", FieldType::Enum(STATUS), "pending")
            .build()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CommandV2Log {
    device_id: String,
    timestamp: DateTime<Utc>,
    log: String,
}

impl Record for CommandV2Log {
    fn shape() -> RecordShape {
        RecordShape::builder("CommandV2Log")
            .field("device_id", FieldType::String)
            .field("timestamp", FieldType::DateTime)
            .field("log", FieldType::String)
            .build()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Page {
    number: i64,
    title: Option<String>,
    body: Vec<u8>,
}

impl Record for Page {
    fn shape() -> RecordShape {
        RecordShape::builder("Page")
            .field("number", FieldType::Integer)
            .optional("title", FieldType::String)
            .field("body", FieldType::Binary)
            .build()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Shadowed {
    pk: String,
}

impl Record for Shadowed {
    fn shape() -> RecordShape {
        RecordShape::builder("Shadowed")
            .field("pk", FieldType::String)
            .build()
    }
}

/// A record whose serde form is looser than its shape.
#[derive(Debug, Serialize, Deserialize)]
struct Loose {
    id: String,
    status: String,
}

impl Record for Loose {
    fn shape() -> RecordShape {
        RecordShape::builder("Loose")
            .field("id", FieldType::String)
            .field("status", FieldType::Enum(STATUS))
            .build()
    }
}

type Slot = (NativeValue, Option<NativeValue>);

/// Store over a plain map that counts every call it receives.
#[derive(Default)]
struct MapStore {
    items: Mutex<HashMap<Slot, Item>>,
    calls: AtomicUsize,
}

impl MapStore {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn slot(item: &Item) -> std::result::Result<Slot, StoreError> {
        let pk = item
            .get(PARTITION_KEY_ATTR)
            .cloned()
            .ok_or(StoreError::MissingKey(PARTITION_KEY_ATTR))?;
        Ok((pk, item.get(SORT_KEY_ATTR).cloned()))
    }
}

#[async_trait]
impl ItemStore for MapStore {
    async fn put(&self, _table: &str, item: Item) -> std::result::Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let slot = Self::slot(&item)?;
        self.items.lock().await.insert(slot, item);
        Ok(())
    }

    async fn get(&self, _table: &str, key: Item) -> std::result::Result<Option<Item>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let slot = Self::slot(&key)?;
        Ok(self.items.lock().await.get(&slot).cloned())
    }

    async fn delete(&self, _table: &str, key: Item) -> std::result::Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let slot = Self::slot(&key)?;
        self.items.lock().await.remove(&slot);
        Ok(())
    }
}

/// Store that answers every call with the same error.
struct FailingStore(StoreError);

#[async_trait]
impl ItemStore for FailingStore {
    async fn put(&self, _table: &str, _item: Item) -> std::result::Result<(), StoreError> {
        Err(self.0.clone())
    }

    async fn get(&self, _table: &str, _key: Item) -> std::result::Result<Option<Item>, StoreError> {
        Err(self.0.clone())
    }

    async fn delete(&self, _table: &str, _key: Item) -> std::result::Result<(), StoreError> {
        Err(self.0.clone())
    }
}

fn command_id() -> Uuid {
    Uuid::parse_str("550e8400-e29b-41d4-a716-446655440001").unwrap()
}

fn table_with_sort_key() -> TableSpec {
    TableSpec::new("dynamo-items").with_sort_key(KeyType::String)
}

fn commands(registry: &mut Registry, table: &TableSpec) -> RecordMapper<Command> {
    RecordMapper::<Command>::builder(table)
        .register(registry)
        .unwrap()
        .into_mapper()
}

fn s(value: &str) -> NativeValue {
    NativeValue::S(value.to_string())
}

#[test]
fn test_first_field_is_default_partition_key() {
    let mut registry = Registry::new();
    let registration = RecordMapper::<Command>::builder(&table_with_sort_key())
        .register(&mut registry)
        .unwrap();

    assert_eq!(registration.index, 0);
    assert_eq!(registry.registered(), 1);

    let mapper = registration.mapper;
    assert_eq!(mapper.partition_key().field(), "command_id");
    assert_eq!(mapper.partition_key().prefix(), Some("CC"));
    assert_eq!(mapper.partition_key().origin(), PrefixOrigin::Allocated);
    assert!(mapper.sort_key().is_none());
    assert_eq!(mapper.registration_index(), 0);
}

#[test]
fn test_to_item_writes_keys_and_native_fields() {
    let mut registry = Registry::new();
    let mapper = commands(&mut registry, &table_with_sort_key());

    let item = mapper.to_item(&Command::new(command_id())).unwrap();

    assert_eq!(
        item[PARTITION_KEY_ATTR],
        s("CC#550e8400-e29b-41d4-a716-446655440001")
    );
    assert_eq!(item[SORT_KEY_ATTR], s(ASSUMED_SORT_KEY));
    assert_eq!(item["command_id"], s("550e8400-e29b-41d4-a716-446655440001"));
    assert_eq!(item["status"], s("pending"));
    assert_eq!(item["retry"], NativeValue::N("0".to_string()));
    assert_eq!(item.len(), 5);
}

#[test]
fn test_table_without_sort_key_writes_no_sort_key() {
    let mut registry = Registry::new();
    let mapper = commands(&mut registry, &TableSpec::new("dynamo-items"));

    let item = mapper.to_item(&Command::new(command_id())).unwrap();

    assert!(!item.contains_key(SORT_KEY_ATTR));
    assert_eq!(mapper.from_item(item).unwrap(), Command::new(command_id()));
}

#[test]
fn test_item_round_trip() {
    let mut registry = Registry::new();
    let mapper = commands(&mut registry, &table_with_sort_key());
    let command = Command {
        command_id: command_id(),
        status: Status::Failed,
        retry: 3,
    };

    let item = mapper.to_item(&command).unwrap();
    assert_eq!(mapper.from_item(item).unwrap(), command);
}

#[test]
fn test_from_item_applies_shape_defaults() {
    let mut registry = Registry::new();
    let mapper = commands(&mut registry, &table_with_sort_key());

    let mut item = Item::new();
    item.insert(
        PARTITION_KEY_ATTR.to_string(),
        s("CC#550e8400-e29b-41d4-a716-446655440001"),
    );
    item.insert(SORT_KEY_ATTR.to_string(), s(ASSUMED_SORT_KEY));
    item.insert(
        "command_id".to_string(),
        s("550e8400-e29b-41d4-a716-446655440001"),
    );

    let command = mapper.from_item(item).unwrap();
    assert_eq!(command.status, Status::Pending);
    assert_eq!(command.retry, 0);
}

#[test]
fn test_from_item_recovers_key_field_from_key() {
    let mut registry = Registry::new();
    let mapper = commands(&mut registry, &table_with_sort_key());

    let mut item = mapper.to_item(&Command::new(command_id())).unwrap();
    item.remove("command_id");

    assert_eq!(mapper.from_item(item).unwrap().command_id, command_id());
}

#[test]
fn test_from_item_prefers_field_attribute_over_key() {
    let mut registry = Registry::new();
    let mapper = commands(&mut registry, &table_with_sort_key());
    let other = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440009").unwrap();

    let mut item = mapper.to_item(&Command::new(command_id())).unwrap();
    item.insert("command_id".to_string(), NativeValue::from(other));

    assert_eq!(mapper.from_item(item).unwrap().command_id, other);
}

#[test]
fn test_from_item_rejects_foreign_prefix() {
    let mut registry = Registry::new();
    let mapper = commands(&mut registry, &table_with_sort_key());

    let mut item = mapper.to_item(&Command::new(command_id())).unwrap();
    item.insert(
        PARTITION_KEY_ATTR.to_string(),
        s("CD#550e8400-e29b-41d4-a716-446655440001"),
    );

    assert!(matches!(
        mapper.from_item(item),
        Err(MapperError::KeyFormat {
            role: KeyRole::Partition,
            ..
        })
    ));
}

#[test]
fn test_from_item_rejects_unexpected_sort_key() {
    let mut registry = Registry::new();
    let mapper = commands(&mut registry, &table_with_sort_key());

    let mut item = mapper.to_item(&Command::new(command_id())).unwrap();
    item.insert(SORT_KEY_ATTR.to_string(), s("B"));

    assert!(matches!(
        mapper.from_item(item),
        Err(MapperError::KeyFormat {
            role: KeyRole::Sort,
            ..
        })
    ));
}

#[test]
fn test_from_item_rejects_stale_enum_value() {
    let mut registry = Registry::new();
    let mapper = commands(&mut registry, &table_with_sort_key());

    let mut item = mapper.to_item(&Command::new(command_id())).unwrap();
    item.insert("status".to_string(), s("archived"));

    assert!(matches!(
        mapper.from_item(item),
        Err(MapperError::Decode(ShapeError::UnknownVariant { .. }))
    ));
}

#[test]
fn test_from_item_requires_key_attributes() {
    let mut registry = Registry::new();
    let mapper = commands(&mut registry, &table_with_sort_key());

    let mut item = mapper.to_item(&Command::new(command_id())).unwrap();
    item.remove(SORT_KEY_ATTR);
    assert!(matches!(
        mapper.from_item(item),
        Err(MapperError::Decode(ShapeError::MissingField { ref field, .. })) if field == "sk"
    ));

    let mut item = mapper.to_item(&Command::new(command_id())).unwrap();
    item.remove(PARTITION_KEY_ATTR);
    assert!(matches!(
        mapper.from_item(item),
        Err(MapperError::Decode(ShapeError::MissingField { ref field, .. })) if field == "pk"
    ));
}

#[test]
fn test_key_rejects_value_of_wrong_type() {
    let mut registry = Registry::new();
    let mapper = commands(&mut registry, &table_with_sort_key());

    assert_eq!(
        mapper.key(NativeValue::from(5i64), None).unwrap_err(),
        MapperError::TypeMismatch {
            role: KeyRole::Partition,
            expected: KeyType::String,
            found: KeyType::Number,
        }
    );
}

#[test]
fn test_key_sort_value_arity() {
    let table = table_with_sort_key();
    let mut registry = Registry::new();
    let commands = commands(&mut registry, &table);
    let v2 = RecordMapper::<CommandV2>::builder(&table)
        .partition_key(Key::field("device_id"))
        .sort_key(Key::field("command_id"))
        .register(&mut registry)
        .unwrap()
        .into_mapper();

    assert_eq!(
        commands
            .key(NativeValue::from(command_id()), Some(s("x")))
            .unwrap_err(),
        MapperError::UnexpectedSortKey {
            kind: "Command".to_string()
        }
    );
    assert_eq!(
        v2.key(s("device-1"), None).unwrap_err(),
        MapperError::MissingSortKey {
            kind: "CommandV2".to_string()
        }
    );
}

#[test]
fn test_item_collection_shares_partition_key() {
    let table = table_with_sort_key();
    let mut registry = Registry::new();
    let v2 = RecordMapper::<CommandV2>::builder(&table)
        .partition_key(Key::field("device_id"))
        .sort_key(Key::field("command_id"))
        .register(&mut registry)
        .unwrap()
        .into_mapper();
    let log = RecordMapper::<CommandV2Log>::builder(&table)
        .partition_key(Key::inherit("device_id", v2.partition_key()))
        .sort_key(Key::field("timestamp"))
        .register(&mut registry)
        .unwrap()
        .into_mapper();

    assert_eq!(v2.partition_key().prefix(), Some("CD"));
    assert_eq!(v2.sort_key().and_then(KeySpec::prefix), Some("CC"));
    assert_eq!(log.partition_key().prefix(), Some("CD"));
    assert_eq!(log.partition_key().origin(), PrefixOrigin::Inherited);
    assert_eq!(log.sort_key().and_then(KeySpec::prefix), Some("CT"));

    let command_item = v2
        .to_item(&CommandV2 {
            device_id: "device-1".to_string(),
            command_id: command_id(),
            status: Status::Complete,
        })
        .unwrap();
    let log_item = log
        .to_item(&CommandV2Log {
            device_id: "device-1".to_string(),
            timestamp: DateTime::parse_from_rfc3339("2024-01-15T10:30:00Z")
                .unwrap()
                .with_timezone(&Utc),
            log: "accepted".to_string(),
        })
        .unwrap();

    assert_eq!(command_item[PARTITION_KEY_ATTR], s("CD#device-1"));
    assert_eq!(command_item[PARTITION_KEY_ATTR], log_item[PARTITION_KEY_ATTR]);
    assert_eq!(
        command_item[SORT_KEY_ATTR],
        s("CC#550e8400-e29b-41d4-a716-446655440001")
    );
    assert_eq!(log_item[SORT_KEY_ATTR], s("CT#2024-01-15T10:30:00Z"));

    // Each mapper only accepts its own sort prefix.
    assert!(v2.from_item(log_item.clone()).is_err());
    assert!(log.from_item(log_item).is_ok());
}

#[test]
fn test_prefixes_unique_per_table_and_role() {
    let table = table_with_sort_key();
    let mut registry = Registry::new();
    let command = commands(&mut registry, &table);
    let v2 = RecordMapper::<CommandV2>::builder(&table)
        .partition_key(Key::field("command_id"))
        .register(&mut registry)
        .unwrap()
        .into_mapper();
    let log = RecordMapper::<CommandV2Log>::builder(&table)
        .register(&mut registry)
        .unwrap()
        .into_mapper();

    let prefixes = [
        command.partition_key().prefix(),
        v2.partition_key().prefix(),
        log.partition_key().prefix(),
    ];
    assert_eq!(prefixes, [Some("CC"), Some("CCO"), Some("CD")]);

    // Another table starts from a clean slate.
    let other = commands(&mut registry, &TableSpec::new("other"));
    assert_eq!(other.partition_key().prefix(), Some("CC"));
    assert_eq!(other.registration_index(), 3);
}

#[test]
fn test_same_registration_sequence_same_prefixes() {
    let run = || {
        let table = table_with_sort_key();
        let mut registry = Registry::new();
        let a = commands(&mut registry, &table);
        let b = RecordMapper::<CommandV2>::builder(&table)
            .partition_key(Key::field("command_id"))
            .register(&mut registry)
            .unwrap()
            .into_mapper();
        (
            a.partition_key().prefix().map(str::to_string),
            b.partition_key().prefix().map(str::to_string),
        )
    };
    assert_eq!(run(), run());
}

#[test]
fn test_explicit_prefix_is_reserved() {
    let table = table_with_sort_key();
    let mut registry = Registry::new();
    let v2 = RecordMapper::<CommandV2>::builder(&table)
        .partition_key(Key::field("device_id").with_prefix("CC"))
        .register(&mut registry)
        .unwrap()
        .into_mapper();
    let command = commands(&mut registry, &table);

    assert_eq!(v2.partition_key().origin(), PrefixOrigin::Explicit);
    assert_eq!(v2.partition_key().prefix(), Some("CC"));
    assert_eq!(command.partition_key().prefix(), Some("CCO"));
}

#[test]
fn test_numeric_field_in_prefixed_key() {
    let mut registry = Registry::new();
    let pages = RecordMapper::<Page>::builder(&TableSpec::new("pages"))
        .register(&mut registry)
        .unwrap()
        .into_mapper();
    let page = Page {
        number: 42,
        title: None,
        body: vec![0, 1, 2],
    };

    let item = pages.to_item(&page).unwrap();
    assert_eq!(item[PARTITION_KEY_ATTR], s("PN#42"));
    assert!(!item.contains_key("title"));

    let mut stripped = item.clone();
    stripped.remove("number");
    assert_eq!(pages.from_item(stripped).unwrap(), page);
    assert_eq!(
        pages.raw_keys(&page).unwrap(),
        (NativeValue::N("42".to_string()), None)
    );
}

#[test]
fn test_unprefixed_key_on_number_table() {
    let table = TableSpec::new("pages").with_partition_key(KeyType::Number);
    let mut registry = Registry::new();
    let pages = RecordMapper::<Page>::builder(&table)
        .partition_key(Key::unprefixed("number"))
        .register(&mut registry)
        .unwrap()
        .into_mapper();
    let page = Page {
        number: 7,
        title: Some("Intro".to_string()),
        body: Vec::new(),
    };

    let item = pages.to_item(&page).unwrap();
    assert_eq!(item[PARTITION_KEY_ATTR], NativeValue::N("7".to_string()));
    assert_eq!(pages.partition_key().prefix(), None);
    assert_eq!(pages.from_item(item).unwrap(), page);
    assert!(matches!(
        pages.key(s("7"), None),
        Err(MapperError::TypeMismatch { .. })
    ));
}

#[test]
fn test_prefixed_key_requires_string_table_key() {
    let table = TableSpec::new("pages").with_partition_key(KeyType::Number);
    let mut registry = Registry::new();
    let err = RecordMapper::<Page>::builder(&table)
        .register(&mut registry)
        .unwrap_err();
    assert_eq!(
        err,
        MapperError::TypeMismatch {
            role: KeyRole::Partition,
            expected: KeyType::String,
            found: KeyType::Number,
        }
    );
}

#[test]
fn test_unprefixed_key_requires_matching_field_type() {
    let mut registry = Registry::new();
    let err = RecordMapper::<Command>::builder(&TableSpec::new("t").with_partition_key(KeyType::Number))
        .partition_key(Key::unprefixed("command_id"))
        .register(&mut registry)
        .unwrap_err();
    assert_eq!(
        err,
        MapperError::TypeMismatch {
            role: KeyRole::Partition,
            expected: KeyType::Number,
            found: KeyType::String,
        }
    );
}

#[test]
fn test_binary_field_cannot_be_prefixed() {
    let mut registry = Registry::new();
    let err = RecordMapper::<Page>::builder(&TableSpec::new("pages"))
        .partition_key(Key::field("body"))
        .register(&mut registry)
        .unwrap_err();
    assert!(matches!(
        err,
        MapperError::TypeMismatch {
            found: KeyType::Binary,
            ..
        }
    ));
}

#[test]
fn test_assumed_sort_key_requires_string_sort_type() {
    let table = TableSpec::new("t").with_sort_key(KeyType::Number);
    let mut registry = Registry::new();
    assert!(matches!(
        RecordMapper::<Command>::builder(&table).register(&mut registry),
        Err(MapperError::TypeMismatch {
            role: KeyRole::Sort,
            ..
        })
    ));
}

#[test]
fn test_declaration_errors() {
    let table = table_with_sort_key();
    let mut registry = Registry::new();

    let missing = RecordMapper::<Command>::builder(&table)
        .partition_key(Key::field("device_id"))
        .register(&mut registry)
        .unwrap_err();
    assert_eq!(
        missing,
        MapperError::InvalidDeclaration {
            kind: "Command".to_string(),
            reason: "the record does not have the field 'device_id'".to_string(),
        }
    );

    let optional = RecordMapper::<Page>::builder(&table)
        .sort_key(Key::field("title"))
        .register(&mut registry)
        .unwrap_err();
    assert!(matches!(optional, MapperError::InvalidDeclaration { .. }));

    let no_sort = RecordMapper::<CommandV2>::builder(&TableSpec::new("t"))
        .sort_key(Key::field("command_id"))
        .register(&mut registry)
        .unwrap_err();
    assert_eq!(
        no_sort,
        MapperError::InvalidDeclaration {
            kind: "CommandV2".to_string(),
            reason: "table 't' has no sort key".to_string(),
        }
    );

    let reserved = RecordMapper::<Shadowed>::builder(&table)
        .register(&mut registry)
        .unwrap_err();
    assert!(matches!(reserved, MapperError::InvalidDeclaration { .. }));

    assert_eq!(registry.registered(), 0);
}

#[test]
fn test_failed_registration_leaves_registry_untouched() {
    let table = table_with_sort_key();
    let mut registry = Registry::new();

    // The partition key allocates before the sort key fails.
    let err = RecordMapper::<CommandV2>::builder(&table)
        .partition_key(Key::field("command_id"))
        .sort_key(Key::field("missing"))
        .register(&mut registry);
    assert!(err.is_err());
    assert_eq!(registry.registered(), 0);
    assert!(registry.allocator(table.name()).is_none());

    let command = commands(&mut registry, &table);
    assert_eq!(command.partition_key().prefix(), Some("CC"));
    assert_eq!(command.registration_index(), 0);
}

#[test]
fn test_to_item_rejects_invalid_record_before_keys() {
    let mut registry = Registry::new();
    let mapper = RecordMapper::<Loose>::builder(&table_with_sort_key())
        .register(&mut registry)
        .unwrap()
        .into_mapper();

    let err = mapper
        .to_item(&Loose {
            id: "1".to_string(),
            status: "unknown".to_string(),
        })
        .unwrap_err();
    assert!(matches!(
        err,
        MapperError::Validation(ShapeError::UnknownVariant { .. })
    ));
}

#[test]
fn test_explicit_prefix_cannot_take_allocated_prefix() {
    let table = table_with_sort_key();
    let mut registry = Registry::new();
    let command = commands(&mut registry, &table);

    let err = RecordMapper::<CommandV2>::builder(&table)
        .partition_key(Key::field("device_id").with_prefix("CC"))
        .register(&mut registry)
        .unwrap_err();
    assert_eq!(
        err,
        MapperError::InvalidDeclaration {
            kind: "CommandV2".to_string(),
            reason: "partition key prefix \"CC\" is already in use on table 'dynamo-items'"
                .to_string(),
        }
    );
    assert_eq!(registry.registered(), 1);

    // Sharing goes through inheritance.
    let v2 = RecordMapper::<CommandV2>::builder(&table)
        .partition_key(Key::inherit("device_id", command.partition_key()))
        .register(&mut registry)
        .unwrap()
        .into_mapper();
    assert_eq!(v2.partition_key().prefix(), Some("CC"));
    assert_eq!(v2.partition_key().origin(), PrefixOrigin::Inherited);
}

#[test]
fn test_explicit_prefix_must_be_plain_text() {
    let table = table_with_sort_key();
    let mut registry = Registry::new();

    for prefix in ["", "CC#550e8400-e29b-41d4-a716-446655440001"] {
        let err = RecordMapper::<Command>::builder(&table)
            .partition_key(Key::field("command_id").with_prefix(prefix))
            .register(&mut registry)
            .unwrap_err();
        assert!(matches!(err, MapperError::InvalidDeclaration { .. }));
    }
    assert_eq!(registry.registered(), 0);
}

#[test]
fn test_explicit_prefix_survives_re_registration() {
    let table = table_with_sort_key();
    let mut registry = Registry::new();
    let register = |registry: &mut Registry| {
        RecordMapper::<CommandV2>::builder(&table)
            .partition_key(Key::field("device_id").with_prefix("DV"))
            .register(registry)
            .unwrap()
            .into_mapper()
    };

    let first = register(&mut registry);
    let second = register(&mut registry);

    assert_eq!(first.partition_key().prefix(), Some("DV"));
    assert_eq!(second.partition_key().prefix(), Some("DV"));
    assert_eq!(registry.registered(), 2);
}

#[test]
fn test_key_rejects_malformed_uuid_text() {
    let mut registry = Registry::new();
    let mapper = commands(&mut registry, &table_with_sort_key());

    assert!(matches!(
        mapper.key(s("not-a-uuid"), None),
        Err(MapperError::Validation(ShapeError::InvalidValue { ref field, .. })) if field == "command_id"
    ));
}

#[tokio::test]
async fn test_put_get_delete_through_store() {
    let mut registry = Registry::new();
    let mapper = commands(&mut registry, &table_with_sort_key());
    let store = MapStore::default();
    let command = Command {
        command_id: command_id(),
        status: Status::Complete,
        retry: 2,
    };

    mapper.put_item(&store, &command).await.unwrap();
    let found = mapper.get_item(&store, command_id(), None).await.unwrap();
    assert_eq!(found, Some(command));

    mapper.delete_item(&store, command_id(), None).await.unwrap();
    assert_eq!(mapper.get_item(&store, command_id(), None).await.unwrap(), None);
    assert_eq!(store.calls(), 4);
}

#[tokio::test]
async fn test_get_missing_item_returns_none() {
    let mut registry = Registry::new();
    let mapper = commands(&mut registry, &table_with_sort_key());
    let store = MapStore::default();

    assert_eq!(mapper.get_item(&store, command_id(), None).await.unwrap(), None);
}

#[tokio::test]
async fn test_page_round_trip_through_store() {
    let mut registry = Registry::new();
    let pages = RecordMapper::<Page>::builder(&TableSpec::new("pages"))
        .register(&mut registry)
        .unwrap()
        .into_mapper();
    let store = MapStore::default();
    let titled = Page {
        number: 1,
        title: Some("Intro".to_string()),
        body: vec![0, 159, 255],
    };
    let untitled = Page {
        number: 2,
        title: None,
        body: Vec::new(),
    };

    pages.put_item(&store, &titled).await.unwrap();
    pages.put_item(&store, &untitled).await.unwrap();

    assert_eq!(pages.get_item(&store, 1i64, None).await.unwrap(), Some(titled));
    assert_eq!(pages.get_item(&store, 2i64, None).await.unwrap(), Some(untitled));
    assert_eq!(pages.get_item(&store, 3i64, None).await.unwrap(), None);
}

#[tokio::test]
async fn test_invalid_record_never_reaches_store() {
    let mut registry = Registry::new();
    let mapper = RecordMapper::<Loose>::builder(&table_with_sort_key())
        .register(&mut registry)
        .unwrap()
        .into_mapper();
    let store = MapStore::default();

    let err = mapper
        .put_item(
            &store,
            &Loose {
                id: "1".to_string(),
                status: "unknown".to_string(),
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        MapperError::Validation(ShapeError::UnknownVariant { .. })
    ));
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_malformed_lookup_never_reaches_store() {
    let mut registry = Registry::new();
    let mapper = commands(&mut registry, &table_with_sort_key());
    let store = MapStore::default();

    assert!(mapper.get_item(&store, "not-a-uuid", None).await.is_err());
    assert!(mapper
        .get_item(&store, NativeValue::from(5i64), None)
        .await
        .is_err());
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_store_errors_pass_through() {
    let mut registry = Registry::new();
    let mapper = commands(&mut registry, &table_with_sort_key());
    let command = Command::new(command_id());

    let throttled = StoreError::Throttled("Throughput exceeded, please retry".to_string());
    let store = FailingStore(throttled.clone());
    assert_eq!(
        mapper.put_item(&store, &command).await.unwrap_err(),
        MapperError::Store(throttled)
    );

    let missing = StoreError::TableNotFound("dynamo-items".to_string());
    let store = FailingStore(missing.clone());
    assert_eq!(
        mapper.get_item(&store, command_id(), None).await.unwrap_err(),
        MapperError::Store(missing.clone())
    );
    assert_eq!(
        mapper.delete_item(&store, command_id(), None).await.unwrap_err(),
        MapperError::Store(missing)
    );
}

#[tokio::test]
async fn test_lookup_accepts_uppercase_uuid() {
    let mut registry = Registry::new();
    let mapper = commands(&mut registry, &table_with_sort_key());
    let store = MapStore::default();
    let command = Command::new(command_id());

    mapper.put_item(&store, &command).await.unwrap();

    let upper = command_id().hyphenated().to_string().to_uppercase();
    assert_eq!(mapper.get_item(&store, upper, None).await.unwrap(), Some(command));
}

#[tokio::test]
async fn test_lookup_accepts_equivalent_datetime() {
    let table = table_with_sort_key();
    let mut registry = Registry::new();
    let v2 = RecordMapper::<CommandV2>::builder(&table)
        .partition_key(Key::field("device_id"))
        .sort_key(Key::field("command_id"))
        .register(&mut registry)
        .unwrap()
        .into_mapper();
    let logs = RecordMapper::<CommandV2Log>::builder(&table)
        .partition_key(Key::inherit("device_id", v2.partition_key()))
        .sort_key(Key::field("timestamp"))
        .register(&mut registry)
        .unwrap()
        .into_mapper();
    let store = MapStore::default();
    let timestamp = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
    let log = CommandV2Log {
        device_id: "device-1".to_string(),
        timestamp,
        log: "accepted".to_string(),
    };

    logs.put_item(&store, &log).await.unwrap();

    for notation in [
        timestamp.to_rfc3339(),
        "2024-01-01T14:00:00+02:00".to_string(),
        "2024-01-01T12:00:00Z".to_string(),
    ] {
        let found = logs
            .get_item(&store, "device-1", Some(NativeValue::S(notation)))
            .await
            .unwrap();
        assert_eq!(found.as_ref(), Some(&log));
    }
}
