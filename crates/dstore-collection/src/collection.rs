use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use bson::{Bson, Document};

use dstore_index::{IndexDefinition, IndexEngine};
use dstore_query::Expression;
use dstore_schema::Schema;
use dstore_storage::{CollectionSnapshot, Restored, StorageAdapter};
use dstore_wal::{EntryType, Operation, WalManager};

use crate::audit::AuditEntry;
use crate::auto_id::AutoId;
use crate::convert::{def_to_snapshot, snapshot_to_def, tree_to_serialized};
use crate::error::CollectionError;
use crate::merge::apply_patch;

const ID_INDEX: &str = "__id";
const TTL_INDEX: &str = "__ttl";
const TTL_FIELD: &str = "__ttltime";

/// Result of `Collection::explain`: which path `find`/`count` would take.
/// The only "index-aware" plan this engine supports is the primary-key
/// fast path — everything else is a full document scan (`spec.md`
/// Non-goals: no index-aware planning beyond PK).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPlan {
    IdIndex,
    FullScan,
}

fn now_millis() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}

/// Collection configuration (`spec.md` §4.5).
pub struct CollectionOptions {
    pub id_field: String,
    pub ttl_millis: Option<i64>,
    pub auto_id: AutoId,
    pub schema: Option<Schema>,
    pub audit: bool,
    pub wal: Option<Arc<WalManager>>,
}

impl Default for CollectionOptions {
    fn default() -> Self {
        CollectionOptions {
            id_field: "id".to_string(),
            ttl_millis: None,
            auto_id: AutoId::None,
            schema: None,
            audit: false,
            wal: None,
        }
    }
}

/// A single document collection: CRUD, index maintenance, TTL eviction,
/// schema-gated writes, and storage/WAL persistence wired together
/// (`spec.md` §4.5). Index-aware query planning beyond primary-key
/// uniqueness is explicitly out of scope (`spec.md` Non-goals), so reads
/// here scan `documents` directly; indexes enforce uniqueness/required/
/// sparse constraints and back the on-disk snapshot format.
pub struct Collection {
    name: String,
    id_field: String,
    documents: Vec<Document>,
    index_engine: IndexEngine,
    storage: Box<dyn StorageAdapter>,
    wal: Option<Arc<WalManager>>,
    schema: Option<Schema>,
    ttl_millis: Option<i64>,
    auto_id: AutoId,
    audit: bool,
    history: Vec<AuditEntry>,
    tx_counter: AtomicU64,
}

impl Collection {
    pub fn new(name: impl Into<String>, mut storage: Box<dyn StorageAdapter>, options: CollectionOptions) -> Result<Self, CollectionError> {
        let name = name.into();
        storage.init(&name)?;
        let mut index_engine = IndexEngine::new();
        index_engine.ensure_index(IndexDefinition::single(ID_INDEX, &options.id_field).unique().required());
        if options.ttl_millis.is_some() {
            index_engine.ensure_index(IndexDefinition::single(TTL_INDEX, TTL_FIELD));
        }
        Ok(Collection {
            name,
            id_field: options.id_field,
            documents: Vec::new(),
            index_engine,
            storage,
            wal: options.wal,
            schema: options.schema,
            ttl_millis: options.ttl_millis,
            auto_id: options.auto_id,
            audit: options.audit,
            history: Vec::new(),
            tx_counter: AtomicU64::new(1),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn history(&self) -> &[AuditEntry] {
        &self.history
    }

    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    // -- persistence -----------------------------------------------------

    fn to_snapshot(&self) -> CollectionSnapshot {
        let mut indexes = BTreeMap::new();
        let mut index_defs = BTreeMap::new();
        for def in self.index_engine.list_indexes() {
            indexes.insert(def.name.clone(), tree_to_serialized(&self.index_engine, &def.name));
            index_defs.insert(def.name.clone(), def_to_snapshot(def));
        }
        CollectionSnapshot {
            list: self.documents.clone(),
            indexes,
            index_defs,
            id_field: self.id_field.clone(),
            ttl_millis: self.ttl_millis,
            rotate: None,
        }
    }

    pub fn snapshot(&self) -> CollectionSnapshot {
        self.to_snapshot()
    }

    pub fn persist(&mut self) -> Result<(), CollectionError> {
        let snapshot = self.to_snapshot();
        self.storage.store(None, &snapshot)?;
        Ok(())
    }

    pub fn store(&mut self) -> Result<(), CollectionError> {
        self.persist()
    }

    /// Restore from the storage adapter. Indexes are rebuilt from the
    /// restored document list rather than decoded from the snapshot's
    /// serialized trees (see `dstore_collection::convert`).
    pub fn load(&mut self) -> Result<bool, CollectionError> {
        let Restored::Found(snapshot) = self.storage.restore(None)? else {
            return Ok(false);
        };
        self.apply_snapshot(snapshot)?;
        Ok(true)
    }

    /// Replace this collection's in-memory state with `snapshot` and rebuild
    /// every index from the restored document list. Shared by `load` (reading
    /// from this collection's own storage adapter) and a transaction
    /// coordinator publishing a staged cross-collection commit.
    pub fn apply_snapshot(&mut self, snapshot: CollectionSnapshot) -> Result<(), CollectionError> {
        self.documents = snapshot.list;
        self.ttl_millis = self.ttl_millis.or(snapshot.ttl_millis);

        self.index_engine = IndexEngine::new();
        for (name, def_snapshot) in &snapshot.index_defs {
            self.index_engine.ensure_index(snapshot_to_def(name, def_snapshot));
        }
        self.index_engine.ensure_index(IndexDefinition::single(ID_INDEX, &self.id_field).unique().required());
        if self.ttl_millis.is_some() {
            self.index_engine.ensure_index(IndexDefinition::single(TTL_INDEX, TTL_FIELD));
        }

        let pairs = self.id_doc_pairs();
        let names: Vec<String> = self.index_engine.list_indexes().map(|d| d.name.clone()).collect();
        for name in names {
            let borrowed: Vec<(&Document, &Bson)> = pairs.iter().map(|(d, i)| (d, i)).collect();
            self.index_engine.rebuild(&name, borrowed.into_iter())?;
        }
        Ok(())
    }

    pub fn reset(&mut self) {
        self.documents.clear();
        self.history.clear();
        let mut index_engine = IndexEngine::new();
        index_engine.ensure_index(IndexDefinition::single(ID_INDEX, &self.id_field).unique().required());
        if self.ttl_millis.is_some() {
            index_engine.ensure_index(IndexDefinition::single(TTL_INDEX, TTL_FIELD));
        }
        self.index_engine = index_engine;
    }

    /// Copy-clone this collection's current state out so the caller can
    /// store it under a new name and reset/persist the source
    /// (`spec.md` §4.5 rotation).
    pub fn rotate(&mut self) -> Result<CollectionSnapshot, CollectionError> {
        let snapshot = self.to_snapshot();
        self.reset();
        self.persist()?;
        Ok(snapshot)
    }

    fn id_doc_pairs(&self) -> Vec<(Document, Bson)> {
        self.documents.iter().map(|d| (d.clone(), d.get(&self.id_field).cloned().unwrap_or(Bson::Null))).collect()
    }

    fn next_tx_id(&self) -> String {
        format!("{}-{}", self.name, self.tx_counter.fetch_add(1, Ordering::SeqCst))
    }

    fn commit_mutation(&mut self, operation: &'static str, wal_op: Operation, id: Option<Bson>) -> Result<(), CollectionError> {
        self.persist()?;
        if let Some(wal) = &self.wal {
            let tx = self.next_tx_id();
            wal.append(&tx, EntryType::Data, &self.name, wal_op, format!("{id:?}").into_bytes())?;
            wal.append(&tx, EntryType::Commit, &self.name, Operation::Commit, vec![])?;
        }
        if self.audit {
            self.history.push(AuditEntry { operation, id, timestamp_millis: now_millis() });
        }
        Ok(())
    }

    fn validate(&self, doc: Document) -> Result<Document, CollectionError> {
        match &self.schema {
            None => Ok(doc),
            Some(schema) => {
                let outcome = dstore_schema::validate_document(schema, &doc);
                if !outcome.valid {
                    return Err(outcome.errors.into());
                }
                Ok(outcome.processed)
            }
        }
    }

    fn find_by_id_unchecked(&self, id: &Bson) -> Option<&Document> {
        self.documents.iter().find(|d| d.get(&self.id_field) == Some(id))
    }

    // -- writes ------------------------------------------------------------

    pub fn create(&mut self, mut doc: Document) -> Result<Document, CollectionError> {
        if !doc.contains_key(&self.id_field) {
            if let Some(id) = self.auto_id.next() {
                doc.insert(self.id_field.clone(), id);
            }
        }
        let mut processed = self.validate(doc)?;
        let id = processed.get(&self.id_field).cloned().unwrap_or(Bson::Null);
        if self.find_by_id_unchecked(&id).is_some() {
            return Err(CollectionError::DuplicateId { id: format!("{id:?}") });
        }
        if self.ttl_millis.is_some() {
            processed.insert(TTL_FIELD, Bson::Int64(now_millis()));
        }
        let outcome = self.index_engine.insert(&processed, &id, &self.documents)?;
        self.documents.push(processed.clone());
        for name in outcome.materialized {
            let pairs = self.id_doc_pairs();
            let borrowed: Vec<(&Document, &Bson)> = pairs.iter().map(|(d, i)| (d, i)).collect();
            self.index_engine.rebuild(&name, borrowed.into_iter())?;
        }
        self.commit_mutation("create", Operation::Store, Some(id))?;
        Ok(processed)
    }

    pub fn push(&mut self, doc: Document) -> Result<Document, CollectionError> {
        self.create(doc)
    }

    /// Insert if the id is new, update (shallow-assign) if it already
    /// exists (`spec.md` §4.5).
    pub fn save(&mut self, doc: Document) -> Result<Document, CollectionError> {
        match doc.get(&self.id_field).cloned() {
            Some(id) if self.find_by_id_unchecked(&id).is_some() => self
                .update_with_id(&id, doc, false)?
                .ok_or_else(|| CollectionError::NotFound { id: format!("{id:?}") }),
            _ => self.create(doc),
        }
    }

    pub fn update_with_id(&mut self, id: &Bson, patch: Document, merge: bool) -> Result<Option<Document>, CollectionError> {
        let Some(pos) = self.documents.iter().position(|d| d.get(&self.id_field) == Some(id)) else {
            return Ok(None);
        };
        let old = self.documents[pos].clone();
        let merged = apply_patch(&old, &patch, merge);
        let processed = self.validate(merged)?;
        self.index_engine.update(&old, &processed, id)?;
        self.documents[pos] = processed.clone();
        self.commit_mutation("update", Operation::Update, Some(id.clone()))?;
        Ok(Some(processed))
    }

    fn matching_ids(&self, filter: &Expression) -> Vec<Bson> {
        self.documents
            .iter()
            .filter(|d| dstore_query::evaluate(filter, d))
            .map(|d| d.get(&self.id_field).cloned().unwrap_or(Bson::Null))
            .collect()
    }

    pub fn update(&mut self, filter: &Expression, patch: &Document, merge: bool) -> Result<usize, CollectionError> {
        let mut count = 0;
        for id in self.matching_ids(filter) {
            if self.update_with_id(&id, patch.clone(), merge)?.is_some() {
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn update_first(&mut self, filter: &Expression, patch: &Document, merge: bool) -> Result<Option<Document>, CollectionError> {
        let Some(id) = self.matching_ids(filter).into_iter().next() else { return Ok(None) };
        self.update_with_id(&id, patch.clone(), merge)
    }

    pub fn update_last(&mut self, filter: &Expression, patch: &Document, merge: bool) -> Result<Option<Document>, CollectionError> {
        let Some(id) = self.matching_ids(filter).into_iter().next_back() else { return Ok(None) };
        self.update_with_id(&id, patch.clone(), merge)
    }

    pub fn remove_with_id(&mut self, id: &Bson) -> Result<Option<Document>, CollectionError> {
        let Some(pos) = self.documents.iter().position(|d| d.get(&self.id_field) == Some(id)) else {
            return Ok(None);
        };
        let removed = self.documents.remove(pos);
        self.index_engine.remove(&removed, id);
        self.commit_mutation("remove", Operation::Delete, Some(id.clone()))?;
        Ok(Some(removed))
    }

    pub fn remove(&mut self, filter: &Expression) -> Result<usize, CollectionError> {
        let mut count = 0;
        for id in self.matching_ids(filter) {
            if self.remove_with_id(&id)?.is_some() {
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn remove_first(&mut self, filter: &Expression) -> Result<Option<Document>, CollectionError> {
        let Some(id) = self.matching_ids(filter).into_iter().next() else { return Ok(None) };
        self.remove_with_id(&id)
    }

    pub fn remove_last(&mut self, filter: &Expression) -> Result<Option<Document>, CollectionError> {
        let Some(id) = self.matching_ids(filter).into_iter().next_back() else { return Ok(None) };
        self.remove_with_id(&id)
    }

    // -- TTL -----------------------------------------------------------

    /// Lazily evict expired documents. Called before every read
    /// (`spec.md` §4.5: "After any read of already-stored documents,
    /// expired entries are lazily evicted").
    pub fn evict_expired(&mut self) -> Result<usize, CollectionError> {
        let Some(ttl) = self.ttl_millis else { return Ok(0) };
        let cutoff = now_millis() - ttl;
        let mut removed = 0;
        let mut i = 0;
        while i < self.documents.len() {
            let expired = matches!(self.documents[i].get(TTL_FIELD), Some(Bson::Int64(t)) if *t < cutoff);
            if expired {
                let doc = self.documents.remove(i);
                let id = doc.get(&self.id_field).cloned().unwrap_or(Bson::Null);
                self.index_engine.remove(&doc, &id);
                removed += 1;
            } else {
                i += 1;
            }
        }
        if removed > 0 {
            self.commit_mutation("evict", Operation::Delete, None)?;
        }
        Ok(removed)
    }

    // -- reads -----------------------------------------------------------

    pub fn find_by_id(&mut self, id: &Bson) -> Result<Option<Document>, CollectionError> {
        self.evict_expired()?;
        Ok(self.find_by_id_unchecked(id).cloned())
    }

    pub fn find_by(&mut self, key: &str, value: &Bson) -> Result<Vec<Document>, CollectionError> {
        self.evict_expired()?;
        Ok(self.documents.iter().filter(|d| d.get(key) == Some(value)).cloned().collect())
    }

    pub fn find_first_by(&mut self, key: &str, value: &Bson) -> Result<Option<Document>, CollectionError> {
        self.evict_expired()?;
        Ok(self.documents.iter().find(|d| d.get(key) == Some(value)).cloned())
    }

    pub fn find_last_by(&mut self, key: &str, value: &Bson) -> Result<Option<Document>, CollectionError> {
        self.evict_expired()?;
        Ok(self.documents.iter().rev().find(|d| d.get(key) == Some(value)).cloned())
    }

    pub fn find(&mut self, filter: &Expression) -> Result<Vec<Document>, CollectionError> {
        self.evict_expired()?;
        Ok(self.documents.iter().filter(|d| dstore_query::evaluate(filter, d)).cloned().collect())
    }

    pub fn find_first(&mut self, filter: &Expression) -> Result<Option<Document>, CollectionError> {
        self.evict_expired()?;
        Ok(self.documents.iter().find(|d| dstore_query::evaluate(filter, d)).cloned())
    }

    pub fn find_last(&mut self, filter: &Expression) -> Result<Option<Document>, CollectionError> {
        self.evict_expired()?;
        Ok(self.documents.iter().rev().find(|d| dstore_query::evaluate(filter, d)).cloned())
    }

    /// Count documents matching `filter` without materializing them.
    pub fn count(&mut self, filter: &Expression) -> Result<usize, CollectionError> {
        self.evict_expired()?;
        Ok(self.documents.iter().filter(|d| dstore_query::evaluate(filter, d)).count())
    }

    /// Whether `find`/`count` against `filter` would resolve through the
    /// id-index fast path or a full scan. `spec.md` Non-goals exclude
    /// index-aware planning beyond the primary key, so this never reports
    /// anything richer than that single fast path.
    pub fn explain(&self, filter: &Expression) -> QueryPlan {
        match filter {
            Expression::Field(path, dstore_query::FieldOp::Eq(_)) if path == &self.id_field => QueryPlan::IdIndex,
            _ => QueryPlan::FullScan,
        }
    }

    pub fn first(&mut self) -> Result<Option<Document>, CollectionError> {
        self.evict_expired()?;
        Ok(self.documents.first().cloned())
    }

    pub fn last(&mut self) -> Result<Option<Document>, CollectionError> {
        self.evict_expired()?;
        Ok(self.documents.last().cloned())
    }

    pub fn oldest(&mut self) -> Result<Option<Document>, CollectionError> {
        self.first()
    }

    pub fn latest(&mut self) -> Result<Option<Document>, CollectionError> {
        self.last()
    }

    pub fn lowest(&mut self, key: &str) -> Result<Option<Document>, CollectionError> {
        self.evict_expired()?;
        Ok(self.documents.iter().filter(|d| d.get(key).is_some()).min_by(|a, b| cmp_field(a, b, key)).cloned())
    }

    pub fn greatest(&mut self, key: &str) -> Result<Option<Document>, CollectionError> {
        self.evict_expired()?;
        Ok(self.documents.iter().filter(|d| d.get(key).is_some()).max_by(|a, b| cmp_field(a, b, key)).cloned())
    }

    // -- indexes -----------------------------------------------------------

    pub fn create_index(&mut self, def: IndexDefinition) -> Result<(), CollectionError> {
        let name = def.name.clone();
        self.index_engine.ensure_index(def);
        let pairs = self.id_doc_pairs();
        let borrowed: Vec<(&Document, &Bson)> = pairs.iter().map(|(d, i)| (d, i)).collect();
        self.index_engine.rebuild(&name, borrowed.into_iter())?;
        Ok(())
    }

    pub fn drop_index(&mut self, name: &str) -> Result<(), CollectionError> {
        self.index_engine.drop_index(name)?;
        Ok(())
    }

    pub fn list_indexes(&self) -> Vec<&IndexDefinition> {
        self.index_engine.list_indexes().collect()
    }

    /// Ids in the order a forward scan of the named index's tree visits
    /// them. Exposed mainly for callers validating composite sort order.
    pub fn index_ids_in_order(&self, name: &str) -> Vec<Bson> {
        let Some(tree) = self.index_engine.get_index(name) else { return Vec::new() };
        dstore_bptree::BPlusTree::iterate(tree).map(|(_, id)| id.clone()).collect()
    }
}

fn cmp_field(a: &Document, b: &Document, key: &str) -> std::cmp::Ordering {
    match (a.get(key), b.get(key)) {
        (Some(x), Some(y)) => match dstore_value::compare(x, y) {
            dstore_value::Comparison::Less => std::cmp::Ordering::Less,
            dstore_value::Comparison::Greater => std::cmp::Ordering::Greater,
            _ => std::cmp::Ordering::Equal,
        },
        _ => std::cmp::Ordering::Equal,
    }
}

pub fn from_list(
    name: impl Into<String>,
    storage: Box<dyn StorageAdapter>,
    options: CollectionOptions,
    docs: Vec<Document>,
) -> Result<Collection, CollectionError> {
    let mut collection = Collection::new(name, storage, options)?;
    for doc in docs {
        collection.create(doc)?;
    }
    Ok(collection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use dstore_storage::{FileAdapter, MemoryAdapter};
    use std::sync::Arc;

    fn memory_collection() -> Collection {
        Collection::new("widgets", Box::new(MemoryAdapter::new()), CollectionOptions::default()).unwrap()
    }

    #[test]
    fn create_assigns_and_rejects_duplicate_ids() {
        let mut coll = memory_collection();
        coll.create(doc! { "id": 1, "name": "bolt" }).unwrap();
        let err = coll.create(doc! { "id": 1, "name": "nut" }).unwrap_err();
        assert!(matches!(err, CollectionError::DuplicateId { .. }));
    }

    #[test]
    fn auto_id_fills_missing_id() {
        let mut options = CollectionOptions::default();
        options.auto_id = AutoId::counter_starting_at(1);
        let mut coll = Collection::new("widgets", Box::new(MemoryAdapter::new()), options).unwrap();
        let created = coll.create(doc! { "name": "bolt" }).unwrap();
        assert_eq!(created.get("id"), Some(&Bson::Int64(1)));
    }

    #[test]
    fn find_by_id_and_filter() {
        let mut coll = memory_collection();
        coll.create(doc! { "id": 1, "name": "bolt", "qty": 3 }).unwrap();
        coll.create(doc! { "id": 2, "name": "nut", "qty": 7 }).unwrap();
        assert_eq!(coll.find_by_id(&Bson::Int32(1)).unwrap().unwrap().get_str("name").unwrap(), "bolt");
        let filter = dstore_query::parse_filter(&doc! { "qty": { "$gt": 5 } }).unwrap();
        let found = coll.find(&filter).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get_str("name").unwrap(), "nut");
    }

    #[test]
    fn update_with_id_merges_by_default() {
        let mut coll = memory_collection();
        coll.create(doc! { "id": 1, "name": "bolt", "meta": { "color": "red" } }).unwrap();
        coll.update_with_id(&Bson::Int32(1), doc! { "meta": { "size": "m" } }, true).unwrap();
        let updated = coll.find_by_id(&Bson::Int32(1)).unwrap().unwrap();
        let meta = updated.get_document("meta").unwrap();
        assert_eq!(meta.get_str("color").unwrap(), "red");
        assert_eq!(meta.get_str("size").unwrap(), "m");
    }

    #[test]
    fn remove_with_id_clears_document_and_index() {
        let mut coll = memory_collection();
        coll.create_index(IndexDefinition::single("by_name", "name").unique()).unwrap();
        coll.create(doc! { "id": 1, "name": "bolt" }).unwrap();
        coll.remove_with_id(&Bson::Int32(1)).unwrap();
        assert!(coll.find_by_id(&Bson::Int32(1)).unwrap().is_none());
        coll.create(doc! { "id": 2, "name": "bolt" }).unwrap();
    }

    #[test]
    fn ttl_entries_evicted_on_read() {
        let mut options = CollectionOptions::default();
        options.ttl_millis = Some(0);
        let mut coll = Collection::new("widgets", Box::new(MemoryAdapter::new()), options).unwrap();
        coll.create(doc! { "id": 1, "name": "bolt" }).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(coll.find_by_id(&Bson::Int32(1)).unwrap().is_none());
    }

    #[test]
    fn persist_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut coll = Collection::new("widgets", Box::new(FileAdapter::new(dir.path())), CollectionOptions::default()).unwrap();
            coll.create_index(IndexDefinition::single("by_name", "name").unique()).unwrap();
            coll.create(doc! { "id": 1, "name": "bolt" }).unwrap();
        }
        let mut reloaded = Collection::new("widgets", Box::new(FileAdapter::new(dir.path())), CollectionOptions::default()).unwrap();
        assert!(reloaded.load().unwrap());
        assert_eq!(reloaded.len(), 1);
        let err = reloaded.create(doc! { "id": 2, "name": "bolt" }).unwrap_err();
        assert!(matches!(err, CollectionError::Index(_)));
    }

    #[test]
    fn wal_records_every_mutation() {
        let wal = Arc::new(WalManager::in_memory());
        let mut options = CollectionOptions::default();
        options.wal = Some(wal.clone());
        let mut coll = Collection::new("widgets", Box::new(MemoryAdapter::new()), options).unwrap();
        coll.create(doc! { "id": 1, "name": "bolt" }).unwrap();
        coll.remove_with_id(&Bson::Int32(1)).unwrap();
        assert_eq!(wal.entries().len(), 4);
    }

    #[test]
    fn count_matches_find_len_and_explain_reports_id_fast_path() {
        let mut coll = memory_collection();
        coll.create(doc! { "id": 1, "qty": 3 }).unwrap();
        coll.create(doc! { "id": 2, "qty": 7 }).unwrap();
        let filter = dstore_query::parse_filter(&doc! { "qty": { "$gt": 5 } }).unwrap();
        assert_eq!(coll.count(&filter).unwrap(), coll.find(&filter).unwrap().len());

        let by_id = dstore_query::parse_filter(&doc! { "id": 1 }).unwrap();
        assert_eq!(coll.explain(&by_id), QueryPlan::IdIndex);
        assert_eq!(coll.explain(&filter), QueryPlan::FullScan);
    }

    #[test]
    fn audit_history_records_operations_when_enabled() {
        let mut options = CollectionOptions::default();
        options.audit = true;
        let mut coll = Collection::new("widgets", Box::new(MemoryAdapter::new()), options).unwrap();
        coll.create(doc! { "id": 1, "name": "bolt" }).unwrap();
        assert_eq!(coll.history().len(), 1);
        assert_eq!(coll.history()[0].operation, "create");
    }
}
