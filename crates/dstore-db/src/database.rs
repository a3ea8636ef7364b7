use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dstore_collection::{AutoId, Collection, CollectionOptions};
use dstore_schema::Schema;
use dstore_storage::FileAdapter;
use dstore_wal::{CheckpointManager, TransactionCoordinator, WalManager};

use crate::error::DbError;
use crate::manifest::{CollectionMeta, DatabaseManifest};

/// What the caller supplies when creating a collection; everything else
/// (the id-index, WAL wiring) is the database's job.
#[derive(Default)]
pub struct CollectionSpec {
    pub id_field: String,
    pub ttl_millis: Option<i64>,
    pub auto_id: AutoId,
    pub schema: Option<Schema>,
    pub audit: bool,
}

impl CollectionSpec {
    pub fn new() -> Self {
        CollectionSpec { id_field: "id".to_string(), auto_id: AutoId::None, ..Default::default() }
    }
}

/// Coordinates multiple named collections that share one on-disk root, a
/// persisted manifest (`<root>/<name>.json`), and cross-collection
/// transactions (`spec.md` §4.7). Each collection still auto-commits its own
/// single-statement mutations through the shared WAL; `start_transaction`
/// adds an explicit prepare/stage/commit envelope around a batch of
/// mutations spanning one or more collections.
pub struct Database {
    name: String,
    root: PathBuf,
    manifest: DatabaseManifest,
    collections: BTreeMap<String, Collection>,
    wal: Arc<WalManager>,
    coordinator: TransactionCoordinator,
    checkpoints: CheckpointManager,
}

impl Database {
    pub fn open(name: impl Into<String>, root: impl Into<PathBuf>) -> Result<Self, DbError> {
        let name = name.into();
        let root = root.into();
        std::fs::create_dir_all(&root)?;

        let manifest_path = Self::manifest_path(&root, &name);
        let manifest = match std::fs::read(&manifest_path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => DatabaseManifest::new(&name),
            Err(e) => return Err(e.into()),
        };

        let wal = Arc::new(WalManager::with_log_file(root.join(format!("{name}.wal")))?);
        let coordinator = TransactionCoordinator::new(WalManager::with_log_file(root.join(format!("{name}.txn.wal")))?);

        let mut db =
            Database { name, root, manifest, collections: BTreeMap::new(), wal, coordinator, checkpoints: CheckpointManager::new() };
        let known: Vec<(String, CollectionMeta)> = db.manifest.collections.iter().map(|(n, m)| (n.clone(), m.clone())).collect();
        for (collection_name, meta) in known {
            let mut spec = CollectionSpec::new();
            spec.id_field = meta.id_field;
            spec.ttl_millis = meta.ttl_millis;
            db.open_collection(&collection_name, spec)?;
        }
        Ok(db)
    }

    fn manifest_path(root: &Path, name: &str) -> PathBuf {
        root.join(format!("{name}.json"))
    }

    fn save_manifest(&self) -> Result<(), DbError> {
        let bytes = serde_json::to_vec_pretty(&self.manifest)?;
        std::fs::write(Self::manifest_path(&self.root, &self.name), bytes)?;
        Ok(())
    }

    fn open_collection(&mut self, name: &str, spec: CollectionSpec) -> Result<(), DbError> {
        let options = CollectionOptions {
            id_field: spec.id_field,
            ttl_millis: spec.ttl_millis,
            auto_id: spec.auto_id,
            schema: spec.schema,
            audit: spec.audit,
            wal: Some(self.wal.clone()),
        };
        let storage = Box::new(FileAdapter::new(self.root.as_path()));
        let mut collection = Collection::new(name, storage, options)?;
        collection.load()?;
        self.collections.insert(name.to_string(), collection);
        Ok(())
    }

    /// Create a new collection. No-op if one with this name already exists
    /// with the same shape — callers that want a fresh collection should
    /// `drop_collection` first.
    pub fn create_collection(&mut self, name: &str, spec: CollectionSpec) -> Result<(), DbError> {
        if self.collections.contains_key(name) {
            return Err(DbError::CollectionExists { name: name.to_string() });
        }
        let meta = CollectionMeta { id_field: spec.id_field.clone(), ttl_millis: spec.ttl_millis };
        self.open_collection(name, spec)?;
        self.manifest.collections.insert(name.to_string(), meta);
        self.save_manifest()?;
        Ok(())
    }

    pub fn collection(&mut self, name: &str) -> Result<&mut Collection, DbError> {
        self.collections.get_mut(name).ok_or_else(|| DbError::UnknownCollection { name: name.to_string() })
    }

    pub fn list_collections(&self) -> Vec<&str> {
        self.collections.keys().map(String::as_str).collect()
    }

    pub fn drop_collection(&mut self, name: &str) -> Result<(), DbError> {
        if self.collections.remove(name).is_none() {
            return Err(DbError::UnknownCollection { name: name.to_string() });
        }
        self.manifest.collections.remove(name);
        self.save_manifest()?;
        Ok(())
    }

    // -- cross-collection transactions ------------------------------------

    /// Begin an explicit transaction. Writes staged with `stage_snapshot`
    /// don't reach any collection until `commit_transaction`.
    pub fn start_transaction(&self, transaction_id: &str) -> Result<(), DbError> {
        self.coordinator.prepare_commit(transaction_id)?;
        Ok(())
    }

    /// Stage a target post-mutation snapshot for one collection inside an
    /// open transaction. The caller builds `snapshot` by starting from
    /// `collection.snapshot()` and applying whatever inserts/updates/removes
    /// the transaction represents against the document list — none of that
    /// reaches the live collection until `commit_transaction`.
    pub fn stage_snapshot(&self, transaction_id: &str, collection: &str, snapshot: dstore_storage::CollectionSnapshot) -> Result<(), DbError> {
        self.coordinator.stage_write(transaction_id, collection, snapshot)?;
        Ok(())
    }

    pub fn commit_transaction(&mut self, transaction_id: &str) -> Result<(), DbError> {
        let writes = self.coordinator.finalize_commit(transaction_id)?;
        for write in writes {
            if let Some(collection) = self.collections.get_mut(&write.collection) {
                collection.apply_snapshot(write.snapshot)?;
                collection.persist()?;
            }
        }
        Ok(())
    }

    pub fn abort_transaction(&self, transaction_id: &str) -> Result<(), DbError> {
        self.coordinator.rollback(transaction_id)?;
        Ok(())
    }

    // -- checkpoints --------------------------------------------------------

    /// Snapshot every collection's current state into a new checkpoint and
    /// return its id. Durable persistence of the checkpoint contents is the
    /// caller's responsibility (`dstore_wal::CheckpointManager`'s own doc
    /// comment); this keeps the in-memory copy a restore point survives
    /// an aborted transaction or a bad migration within the same process.
    pub fn checkpoint(&self) -> String {
        let snapshots: BTreeMap<String, dstore_storage::CollectionSnapshot> =
            self.collections.iter().map(|(name, collection)| (name.clone(), collection.snapshot())).collect();
        self.checkpoints.create_checkpoint(snapshots)
    }

    /// Restore every collection named in checkpoint `id` to its snapshot at
    /// that point, persisting the restored state. Collections created after
    /// the checkpoint was taken are left untouched.
    pub fn restore_checkpoint(&mut self, id: &str) -> Result<(), DbError> {
        let snapshots = self.checkpoints.restore_from_checkpoint(id)?;
        for (name, snapshot) in snapshots {
            if let Some(collection) = self.collections.get_mut(&name) {
                collection.apply_snapshot(snapshot)?;
                collection.persist()?;
            }
        }
        Ok(())
    }

    /// The shared WAL every collection auto-commits its statement-level
    /// mutations through.
    pub fn wal(&self) -> &WalManager {
        &self.wal
    }

    /// The separate WAL the transaction coordinator records
    /// PREPARE/DATA/COMMIT/ROLLBACK markers to.
    pub fn transaction_log(&self) -> &WalManager {
        self.coordinator.wal()
    }
}
