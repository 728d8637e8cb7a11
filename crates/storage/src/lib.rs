#![forbid(unsafe_code)]

//! Persistence for the link list and settings: a small key/value contract with a
//! change feed, a SQLite-backed implementation shared between devices on disk, an
//! in-memory one for tests, and the typed layer that maps both keys onto it.

mod clock;
mod error;
mod kv;
mod links;

pub use error::StoreError;
pub use kv::memory::MemoryKvStore;
pub use kv::sqlite::SqliteKvStore;
pub use kv::{KeyValueStore, QUOTA_BYTES, QUOTA_BYTES_PER_ITEM, StorageChange, item_size};
pub use links::{LIST_KEY, LinkStorage, SETTINGS_KEY, SaveOutcome, Usage, decode_list};
