//! dynamo_items - storage backends, configuration and demo record kinds
//! for `dynamo_items_core`.

pub mod config;
pub mod demo;
pub mod models;
pub mod storage;

pub use config::Config;
