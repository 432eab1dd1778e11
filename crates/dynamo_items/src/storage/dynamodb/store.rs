//! DynamoDB item store implementation.

use async_trait::async_trait;
use aws_sdk_dynamodb::Client;

use dynamo_items_core::storage::{Item, ItemStore, StoreError};

use super::conversions::{from_attribute_map, to_attribute_map};
use super::error::{
    map_connection_error, map_delete_item_error, map_get_item_error, map_put_item_error,
};
use crate::config::Config;

/// DynamoDB-based item store.
///
/// Retries and timeouts are whatever the SDK client is configured with.
#[derive(Debug, Clone)]
pub struct DynamoDbStore {
    client: Client,
}

impl DynamoDbStore {
    /// Creates a new store with the given DynamoDB client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Creates a new store from configuration.
    ///
    /// Uses the AWS SDK default credential chain, the configured region and,
    /// when set, the custom endpoint URL.
    pub async fn from_config(config: &Config) -> Result<Self, StoreError> {
        if config.region.trim().is_empty() {
            return Err(map_connection_error("AWS region is empty"));
        }

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;
        Ok(Self::new(Client::new(&sdk_config)))
    }
}

#[async_trait]
impl ItemStore for DynamoDbStore {
    async fn put(&self, table: &str, item: Item) -> Result<(), StoreError> {
        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(to_attribute_map(item)))
            .send()
            .await
            .map_err(|e| map_put_item_error(e, table))?;

        Ok(())
    }

    async fn get(&self, table: &str, key: Item) -> Result<Option<Item>, StoreError> {
        let result = self
            .client
            .get_item()
            .table_name(table)
            .set_key(Some(to_attribute_map(key)))
            .send()
            .await
            .map_err(|e| map_get_item_error(e, table))?;

        match result.item {
            Some(item) => Ok(Some(from_attribute_map(item)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, table: &str, key: Item) -> Result<(), StoreError> {
        self.client
            .delete_item()
            .table_name(table)
            .set_key(Some(to_attribute_map(key)))
            .send()
            .await
            .map_err(|e| map_delete_item_error(e, table))?;

        Ok(())
    }
}
