#![forbid(unsafe_code)]

pub mod keys;
pub mod local;
pub mod repository;
pub mod sqlite;

pub use local::LocalProgress;
pub use repository::{InMemoryKeyValueStore, KeyValueStore, Storage, StorageError};
