use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// What a database remembers about each collection across restarts
/// (`spec.md` §4.6/§4.7: a persisted schema file alongside collection
/// snapshots). Per-field validation schemas aren't persisted here — a
/// `FieldSchema`'s custom validator is a host closure, not serializable data,
/// so schemas are supplied again by the embedding application on reopen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionMeta {
    pub id_field: String,
    pub ttl_millis: Option<i64>,
}

impl Default for CollectionMeta {
    fn default() -> Self {
        CollectionMeta { id_field: "id".to_string(), ttl_millis: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DatabaseManifest {
    pub name: String,
    pub collections: BTreeMap<String, CollectionMeta>,
}

impl DatabaseManifest {
    pub fn new(name: impl Into<String>) -> Self {
        DatabaseManifest { name: name.into(), collections: BTreeMap::new() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_round_trips_through_json() {
        let mut manifest = DatabaseManifest::new("shop");
        manifest.collections.insert("widgets".to_string(), CollectionMeta { id_field: "id".to_string(), ttl_millis: Some(1000) });
        let json = serde_json::to_string(&manifest).unwrap();
        let restored: DatabaseManifest = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.name, "shop");
        assert_eq!(restored.collections["widgets"].ttl_millis, Some(1000));
    }
}
