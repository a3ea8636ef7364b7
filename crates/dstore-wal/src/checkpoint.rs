use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use dstore_storage::CollectionSnapshot;

use crate::error::WalError;

/// In-memory checkpoint store (`spec.md` §4.7): `createCheckpoint` deep-copies
/// the current per-collection snapshots; `restoreFromCheckpoint` hands that
/// copy back. Durable persistence of a checkpoint (the file adapter's
/// `checkpoint_<id>.json`) is left to the caller, which already has a
/// `StorageAdapter` and can call `store(Some(&format!("checkpoint_{id}")), ..)`
/// per collection using the same ids this type hands out.
#[derive(Default)]
pub struct CheckpointManager {
    next_id: AtomicU64,
    checkpoints: Mutex<BTreeMap<String, BTreeMap<String, CollectionSnapshot>>>,
}

impl CheckpointManager {
    pub fn new() -> Self {
        Self { next_id: AtomicU64::new(1), checkpoints: Mutex::new(BTreeMap::new()) }
    }

    pub fn create_checkpoint(&self, snapshots: BTreeMap<String, CollectionSnapshot>) -> String {
        let id = format!("ckpt-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.checkpoints.lock().unwrap().insert(id.clone(), snapshots);
        id
    }

    pub fn restore_from_checkpoint(&self, id: &str) -> Result<BTreeMap<String, CollectionSnapshot>, WalError> {
        self.checkpoints
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| WalError::UnknownCheckpoint { id: id.to_string() })
    }
}
