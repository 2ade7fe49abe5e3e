pub mod backend;
pub mod error;
pub mod file;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod mirror;
pub mod postgres;
pub mod query;
pub mod store;

pub use backend::{open_store, StoreBackend};
pub use error::{StoreError, StoreResult};
pub use file::FileStore;
#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryStore;
pub use mirror::{mirror_missing, MirrorReport};
pub use postgres::PgStore;
pub use query::{Combine, Field, Query, Term};
pub use store::{validate_index, RecordStore};
