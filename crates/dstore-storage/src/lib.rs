//! Pluggable collection persistence: memory and file-backed adapters (C6).

mod adapter;
mod error;
mod file;
mod memory;
mod snapshot;

pub use adapter::{Restored, StorageAdapter};
pub use error::StorageError;
pub use file::FileAdapter;
pub use memory::MemoryAdapter;
pub use snapshot::{CollectionSnapshot, IndexDefSnapshot, SerializedTree};
