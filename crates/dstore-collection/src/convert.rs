use dstore_bptree::BPlusTree;
use dstore_index::{encode_key, IndexDefinition, IndexEngine, IndexField, SortOrder};
use dstore_storage::{IndexDefSnapshot, SerializedTree};

pub fn def_to_snapshot(def: &IndexDefinition) -> IndexDefSnapshot {
    IndexDefSnapshot {
        fields: def.fields.iter().map(|f| (f.path.clone(), f.order == SortOrder::Desc)).collect(),
        unique: def.unique,
        sparse: def.sparse,
        required: def.required,
        case_insensitive: def.case_insensitive,
        wildcard: def.wildcard,
        separator: def.separator,
        auto: def.auto,
    }
}

pub fn snapshot_to_def(name: &str, snapshot: &IndexDefSnapshot) -> IndexDefinition {
    if snapshot.wildcard {
        let mut def = IndexDefinition::wildcard(name);
        def.sparse = snapshot.sparse;
        def.required = snapshot.required;
        def.case_insensitive = snapshot.case_insensitive;
        def.unique = snapshot.unique;
        def.separator = snapshot.separator;
        def.auto = snapshot.auto;
        return def;
    }
    let fields = snapshot
        .fields
        .iter()
        .map(|(path, desc)| if *desc { IndexField::desc(path.clone()) } else { IndexField::asc(path.clone()) })
        .collect();
    let mut def = IndexDefinition::composite(name, fields);
    def.unique = snapshot.unique;
    def.sparse = snapshot.sparse;
    def.required = snapshot.required;
    def.case_insensitive = snapshot.case_insensitive;
    def.separator = snapshot.separator;
    def.auto = snapshot.auto;
    def
}

/// Render one index's tree to the `(encoded_key, ids)` pairs the on-disk
/// snapshot format uses. This is informational only — `load` rebuilds every
/// index from the restored document list rather than decoding these strings
/// back into `IndexKey`s, since `encode_key`'s `Debug`-based encoding isn't
/// meant to round-trip (`spec.md` §4.6).
pub fn tree_to_serialized(engine: &IndexEngine, name: &str) -> SerializedTree {
    let Some(tree) = engine.get_index(name) else { return Vec::new() };
    let separator = engine.get_def(name).map(|def| def.effective_separator()).unwrap_or(dstore_index::DEFAULT_SEPARATOR);
    let mut out: Vec<(String, Vec<bson::Bson>)> = Vec::new();
    for (key, id) in tree.iterate() {
        let encoded = encode_key(key, separator);
        match out.last_mut() {
            Some((k, ids)) if *k == encoded => ids.push(id.clone()),
            _ => out.push((encoded, vec![id.clone()])),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn def_round_trips_through_snapshot() {
        let def = IndexDefinition::single("by_name", "name").unique().sparse();
        let snapshot = def_to_snapshot(&def);
        let restored = snapshot_to_def("by_name", &snapshot);
        assert_eq!(restored.unique, def.unique);
        assert_eq!(restored.sparse, def.sparse);
        assert_eq!(restored.fields[0].path, def.fields[0].path);
    }

    #[test]
    fn separator_and_auto_round_trip_through_snapshot() {
        let def = IndexDefinition::single("by_slug", "slug").separator('|');
        let mut def = def;
        def.auto = true;
        let snapshot = def_to_snapshot(&def);
        let restored = snapshot_to_def("by_slug", &snapshot);
        assert_eq!(restored.effective_separator(), '|');
        assert!(restored.auto);
        assert!(restored.gen.is_none());
    }

    #[test]
    fn wildcard_def_round_trips() {
        let def = IndexDefinition::wildcard("*");
        let snapshot = def_to_snapshot(&def);
        let restored = snapshot_to_def("*", &snapshot);
        assert!(restored.wildcard);
    }

    #[test]
    fn serialized_tree_groups_ids_under_one_key() {
        let mut engine = IndexEngine::new();
        engine.ensure_index(IndexDefinition::single("by_age", "age"));
        engine.insert(&doc! { "age": 10 }, &bson::Bson::Int32(1), &[]).unwrap();
        engine.insert(&doc! { "age": 10 }, &bson::Bson::Int32(2), &[]).unwrap();
        let serialized = tree_to_serialized(&engine, "by_age");
        assert_eq!(serialized.len(), 1);
        assert_eq!(serialized[0].1.len(), 2);
    }
}
