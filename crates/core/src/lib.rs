//! Map typed records onto a single DynamoDB-style table.
//!
//! Several record kinds can share one physical table. Each kind's keys are
//! stored as `<prefix>#<value>`, where the prefix is derived from the kind
//! and field names at registration time, so kinds never collide and related
//! kinds can deliberately share a partition prefix to form item collections.
//!
//! ```ignore
//! let table = TableSpec::new("dynamo-items").with_sort_key(KeyType::String);
//! let mut registry = Registry::new();
//! let commands = RecordMapper::<Command>::builder(&table)
//!     .register(&mut registry)?
//!     .into_mapper();
//!
//! commands.put_item(&store, &command).await?;
//! let found = commands.get_item(&store, command.command_id, None).await?;
//! ```

pub mod mapping;
pub mod shape;
pub mod storage;

pub use mapping::{
    Key, KeyRole, KeySpec, MapperError, RecordMapper, Registration, Registry, TableSpec,
    ASSUMED_SORT_KEY,
};
pub use shape::{FieldType, Record, RecordShape, ShapeError};
pub use storage::{Item, ItemStore, KeyType, NativeValue, StoreError};
