mod error;
mod keys;
mod mapper;
mod prefix;
mod registry;
mod table;

#[cfg(test)]
mod tests;

pub use error::{MapperError, Result};
pub use keys::{Key, KeyRole, KeySpec, PrefixOrigin, KEY_SEPARATOR};
pub use mapper::{RecordMapper, ASSUMED_SORT_KEY};
pub use prefix::{PrefixAllocator, MAX_PREFIX_ATTEMPTS, MAX_PREFIX_LEN};
pub use registry::{MapperBuilder, Registration, Registry};
pub use table::TableSpec;
