use std::env;

use dynamo_items_core::{KeyType, TableSpec};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Table name (default: "dynamo-items")
    pub table_name: String,
    /// Whether the table declares a string sort key (default: true)
    pub sort_key: bool,
    /// Custom endpoint URL, for local DynamoDB (default: none)
    pub endpoint_url: Option<String>,
    /// AWS region (default: "us-east-1")
    pub region: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `DYDB_TABLE_NAME` - Table name (default: "dynamo-items")
    /// - `DYDB_SORT_KEY` - `true`/`false`, whether the table has a sort key (default: true)
    /// - `AWS_ENDPOINT_URL` - Custom DynamoDB endpoint (default: none)
    /// - `AWS_REGION` - AWS region (default: "us-east-1")
    pub fn from_env() -> Self {
        Self {
            table_name: env::var("DYDB_TABLE_NAME").unwrap_or_else(|_| "dynamo-items".to_string()),
            sort_key: env::var("DYDB_SORT_KEY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            endpoint_url: env::var("AWS_ENDPOINT_URL").ok(),
            region: env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
        }
    }

    /// The table every demo record kind is declared against.
    pub fn table_spec(&self) -> TableSpec {
        let table = TableSpec::new(&self.table_name);
        if self.sort_key {
            table.with_sort_key(KeyType::String)
        } else {
            table
        }
    }

    /// Returns a display string for the target environment.
    pub fn target_display(&self) -> String {
        match &self.endpoint_url {
            Some(url) => format!("Local DynamoDB ({})", url),
            None => format!("AWS DynamoDB (region: {})", self.region),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
