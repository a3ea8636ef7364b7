use std::collections::BTreeMap;

use bson::{Bson, Document};
use serde::{Deserialize, Serialize};

/// A serializable mirror of `dstore_index::IndexDefinition` — kept here
/// rather than depending on `dstore-index` directly, since storage sits
/// below the index layer (`spec.md` §3 layering). The collection layer
/// converts between the two.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexDefSnapshot {
    pub fields: Vec<(String, bool)>,
    pub unique: bool,
    pub sparse: bool,
    pub required: bool,
    pub case_insensitive: bool,
    pub wildcard: bool,
    /// Separator override for `SerializedTree` key rendering (`spec.md` §6's
    /// `IndexDef.separator`); `None` means the default. `auto`/`gen`/`process`
    /// are not persisted here since `gen`/`process` are host closures — only
    /// `auto` itself is plain data, carried so a reopened database still
    /// knows the flag was set even though the generator can't be restored.
    pub separator: Option<char>,
    pub auto: bool,
}

/// One index's persisted contents: encoded key -> ordered id list, produced
/// by `dstore_index::encode_key` over each tree entry.
pub type SerializedTree = Vec<(String, Vec<Bson>)>;

/// The full durable state of one collection (`spec.md` §4.6):
/// `{list, indexes, indexDefs, id, ttl, rotate?}`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CollectionSnapshot {
    pub list: Vec<Document>,
    pub indexes: BTreeMap<String, SerializedTree>,
    pub index_defs: BTreeMap<String, IndexDefSnapshot>,
    pub id_field: String,
    pub ttl_millis: Option<i64>,
    pub rotate: Option<String>,
}

impl CollectionSnapshot {
    pub fn empty(id_field: impl Into<String>) -> Self {
        CollectionSnapshot { id_field: id_field.into(), ..Default::default() }
    }
}
