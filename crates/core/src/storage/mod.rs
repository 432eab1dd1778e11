mod error;
mod traits;
mod types;

pub use error::StoreError;
pub use traits::ItemStore;
pub use types::{Item, KeyType, NativeValue, PARTITION_KEY_ATTR, SORT_KEY_ATTR};
