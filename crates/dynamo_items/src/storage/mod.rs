//! Storage backend implementations.
//!
//! This module provides concrete implementations of the `ItemStore` trait
//! defined in `dynamo_items_core::storage`.
//!
//! # Feature Flags
//!
//! - `dynamodb`: AWS DynamoDB storage backend using `aws-sdk-dynamodb`
//!
//! The in-memory backend is always available and is the default target of
//! the demo CLI.
//!
//! # Examples
//!
//! Build with DynamoDB:
//! ```bash
//! cargo build -p dynamo_items --features dynamodb
//! ```

pub mod inmemory;

#[cfg(feature = "dynamodb")]
pub mod dynamodb;

pub use inmemory::InMemoryStore;

#[cfg(feature = "dynamodb")]
pub use dynamodb::DynamoDbStore;
