use async_trait::async_trait;

use super::{Item, StoreError};

/// The key/value store a [`RecordMapper`](crate::mapping::RecordMapper) writes to.
///
/// Items carry their key in the `pk` and, for tables with a sort key, `sk`
/// attributes. Retries, pagination and timeouts belong to the implementation.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Writes a full item, replacing any item with the same key.
    async fn put(&self, table: &str, item: Item) -> Result<(), StoreError>;

    /// Reads the item stored under `key`, if any.
    async fn get(&self, table: &str, key: Item) -> Result<Option<Item>, StoreError>;

    /// Removes the item stored under `key`. Removing a missing item is not an error.
    async fn delete(&self, table: &str, key: Item) -> Result<(), StoreError>;
}
