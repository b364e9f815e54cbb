//! Infrastructure adapters owned by the API binary.

pub mod file_storage;

pub use file_storage::LocalFileStorage;
