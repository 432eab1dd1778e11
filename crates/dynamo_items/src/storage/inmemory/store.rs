//! In-memory item store.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use dynamo_items_core::storage::{
    Item, ItemStore, NativeValue, StoreError, PARTITION_KEY_ATTR, SORT_KEY_ATTR,
};

type StoredKey = (String, NativeValue, Option<NativeValue>);

/// In-memory storage backend for testing and demos.
///
/// Items are kept ordered by `(table, pk, sk)`, the same order a range read
/// on the real store returns them in. Data is not persisted and will be lost
/// when the store is dropped.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    items: Arc<RwLock<BTreeMap<StoredKey, Item>>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of items across all tables.
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    /// Every item stored under partition key `pk`, in sort key order.
    pub async fn collection(&self, table: &str, pk: &NativeValue) -> Vec<Item> {
        let items = self.items.read().await;
        items
            .iter()
            .filter(|((t, p, _), _)| t == table && p == pk)
            .map(|(_, item)| item.clone())
            .collect()
    }
}

fn stored_key(table: &str, item: &Item) -> Result<StoredKey, StoreError> {
    let pk = item
        .get(PARTITION_KEY_ATTR)
        .cloned()
        .ok_or(StoreError::MissingKey(PARTITION_KEY_ATTR))?;
    Ok((table.to_string(), pk, item.get(SORT_KEY_ATTR).cloned()))
}

#[async_trait]
impl ItemStore for InMemoryStore {
    async fn put(&self, table: &str, item: Item) -> Result<(), StoreError> {
        let key = stored_key(table, &item)?;
        let mut items = self.items.write().await;
        items.insert(key, item);
        Ok(())
    }

    async fn get(&self, table: &str, key: Item) -> Result<Option<Item>, StoreError> {
        let key = stored_key(table, &key)?;
        let items = self.items.read().await;
        let found = items.get(&key).cloned();
        if found.is_some() {
            tracing::trace!(table, pk = %key.1, "Item hit");
        } else {
            tracing::trace!(table, pk = %key.1, "Item miss");
        }
        Ok(found)
    }

    async fn delete(&self, table: &str, key: Item) -> Result<(), StoreError> {
        let key = stored_key(table, &key)?;
        let mut items = self.items.write().await;
        items.remove(&key);
        Ok(())
    }
}
