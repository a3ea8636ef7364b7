use crate::adapter::{Restored, StorageAdapter};
use crate::error::StorageError;
use crate::snapshot::CollectionSnapshot;

/// Memory adapter: no durable backing store. `restore` always reports
/// nothing found and `store` is a no-op (`spec.md` §4.6) — the collection's
/// actual state lives entirely in the in-process document list above this
/// layer.
#[derive(Debug, Default, Clone)]
pub struct MemoryAdapter {
    collection: String,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageAdapter for MemoryAdapter {
    fn init(&mut self, collection: &str) -> Result<(), StorageError> {
        self.collection = collection.to_string();
        Ok(())
    }

    fn restore(&self, _name: Option<&str>) -> Result<Restored, StorageError> {
        Ok(Restored::NotFound)
    }

    fn store(&self, _name: Option<&str>, _snapshot: &CollectionSnapshot) -> Result<(), StorageError> {
        Ok(())
    }

    fn clone_adapter(&self) -> Box<dyn StorageAdapter> {
        Box::new(self.clone())
    }

    fn adapter_name(&self) -> &str {
        &self.collection
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restore_is_always_empty() {
        let mut adapter = MemoryAdapter::new();
        adapter.init("widgets").unwrap();
        assert!(matches!(adapter.restore(None).unwrap(), Restored::NotFound));
    }

    #[test]
    fn store_is_a_no_op() {
        let mut adapter = MemoryAdapter::new();
        adapter.init("widgets").unwrap();
        adapter.store(None, &CollectionSnapshot::empty("_id")).unwrap();
        assert!(matches!(adapter.restore(None).unwrap(), Restored::NotFound));
    }
}
