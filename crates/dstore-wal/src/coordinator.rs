use std::collections::BTreeMap;
use std::sync::Mutex;

use dstore_storage::CollectionSnapshot;

use crate::entry::{EntryType, Operation};
use crate::error::WalError;
use crate::manager::WalManager;

/// One collection's staged snapshot inside an in-flight transaction.
#[derive(Debug, Clone)]
pub struct StagedWrite {
    pub collection: String,
    pub snapshot: CollectionSnapshot,
}

/// Drives the `prepareCommit` / `finalizeCommit` / `rollback` lifecycle
/// (`spec.md` §4.7). Staging lives in memory; applying a staged write to
/// durable storage (via `StorageAdapter::store`) and to the in-memory
/// document list is the caller's job — this type only owns the WAL
/// bookkeeping and the staged-snapshot buffer, since "publish" means
/// something different for a memory adapter (swap into the live list) than
/// for a file adapter (write to disk), and only the collection layer knows
/// which.
pub struct TransactionCoordinator {
    wal: WalManager,
    staged: Mutex<BTreeMap<String, Vec<StagedWrite>>>,
}

impl TransactionCoordinator {
    pub fn new(wal: WalManager) -> Self {
        TransactionCoordinator { wal, staged: Mutex::new(BTreeMap::new()) }
    }

    pub fn wal(&self) -> &WalManager {
        &self.wal
    }

    /// No conflict detection: the concurrency model forbids concurrent
    /// transactions per collection and relies on the caller to serialize
    /// (`spec.md` §5), so this always succeeds once the PREPARE entry lands.
    pub fn prepare_commit(&self, transaction_id: &str) -> Result<bool, WalError> {
        self.wal.append(transaction_id, EntryType::Prepare, "", Operation::Store, vec![])?;
        self.staged.lock().unwrap().entry(transaction_id.to_string()).or_default();
        Ok(true)
    }

    pub fn stage_write(&self, transaction_id: &str, collection: &str, snapshot: CollectionSnapshot) -> Result<(), WalError> {
        let data = serde_json::to_vec(&snapshot)?;
        self.wal.append(transaction_id, EntryType::Data, collection, Operation::Store, data)?;
        self.staged
            .lock()
            .unwrap()
            .entry(transaction_id.to_string())
            .or_default()
            .push(StagedWrite { collection: collection.to_string(), snapshot });
        Ok(())
    }

    /// Drop the staged writes for `transaction_id` and append the COMMIT
    /// marker. Returns what must now be published to storage.
    pub fn finalize_commit(&self, transaction_id: &str) -> Result<Vec<StagedWrite>, WalError> {
        let writes = self
            .staged
            .lock()
            .unwrap()
            .remove(transaction_id)
            .ok_or_else(|| WalError::UnknownTransaction { id: transaction_id.to_string() })?;
        self.wal.append(transaction_id, EntryType::Commit, "", Operation::Commit, vec![])?;
        Ok(writes)
    }

    pub fn rollback(&self, transaction_id: &str) -> Result<(), WalError> {
        self.staged.lock().unwrap().remove(transaction_id);
        self.wal.append(transaction_id, EntryType::Rollback, "", Operation::Delete, vec![])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn full_lifecycle_stages_then_publishes() {
        let coord = TransactionCoordinator::new(WalManager::in_memory());
        coord.prepare_commit("tx1").unwrap();
        let mut snapshot = CollectionSnapshot::empty("_id");
        snapshot.list.push(doc! { "_id": 1 });
        coord.stage_write("tx1", "widgets", snapshot).unwrap();
        let writes = coord.finalize_commit("tx1").unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].collection, "widgets");
    }

    #[test]
    fn rollback_drops_staged_writes() {
        let coord = TransactionCoordinator::new(WalManager::in_memory());
        coord.prepare_commit("tx1").unwrap();
        coord.stage_write("tx1", "widgets", CollectionSnapshot::empty("_id")).unwrap();
        coord.rollback("tx1").unwrap();
        let err = coord.finalize_commit("tx1").unwrap_err();
        assert!(matches!(err, WalError::UnknownTransaction { .. }));
    }

    #[test]
    fn wal_records_full_lifecycle() {
        let coord = TransactionCoordinator::new(WalManager::in_memory());
        coord.prepare_commit("tx1").unwrap();
        coord.stage_write("tx1", "widgets", CollectionSnapshot::empty("_id")).unwrap();
        coord.finalize_commit("tx1").unwrap();
        let entries = coord.wal().entries_for("tx1");
        assert_eq!(entries.len(), 3);
        assert_eq!(entries.last().unwrap().entry_type, EntryType::Commit);
    }
}
