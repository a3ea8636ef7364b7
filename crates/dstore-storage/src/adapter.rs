use crate::error::StorageError;
use crate::snapshot::CollectionSnapshot;

/// What `restore` finds for a given name (`spec.md` §4.6's `SnapshotOrFalse`).
pub enum Restored {
    Found(CollectionSnapshot),
    NotFound,
}

/// Pluggable persistence boundary shared by every collection
/// (`spec.md` §4.6). `name` defaults to the collection the adapter was
/// `init`-ed with; call sites pass an explicit name for checkpoints and
/// rotation targets.
pub trait StorageAdapter: Send + Sync {
    fn init(&mut self, collection: &str) -> Result<(), StorageError>;
    fn restore(&self, name: Option<&str>) -> Result<Restored, StorageError>;
    fn store(&self, name: Option<&str>, snapshot: &CollectionSnapshot) -> Result<(), StorageError>;
    fn clone_adapter(&self) -> Box<dyn StorageAdapter>;
    fn adapter_name(&self) -> &str;
}
