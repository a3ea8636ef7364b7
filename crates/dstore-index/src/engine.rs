use std::collections::{BTreeMap, BTreeSet};

use bson::{Bson, Document};
use dstore_bptree::{BPlusTree, OrderedTree};

use crate::def::IndexDefinition;
use crate::error::IndexError;
use crate::key::{IndexKey, KeyComponent, SortOrder};
use crate::path::get_path;

/// What an index definition resolves to for one document: absent, a single
/// key, or (multikey, single-field indexes over an array) several keys.
enum Resolution {
    Missing,
    Single(IndexKey),
    Multi(Vec<IndexKey>),
}

/// Apply an index's `process` override if set, else the default
/// case-insensitive lowering (`spec.md` §6: `process` replaces, not
/// supplements, that default).
fn transform_component(value: &Bson, def: &IndexDefinition) -> Bson {
    match &def.process {
        Some(process) => process(value),
        None if def.case_insensitive => match value {
            Bson::String(s) => Bson::String(s.to_lowercase()),
            other => other.clone(),
        },
        None => value.clone(),
    }
}

/// Resolve one document against one index definition. `existing` is the
/// document list `auto`/`gen` synthesize a missing key from (`spec.md` §6's
/// `gen: (item, name, list) -> key`); pass `&[]` where auto-generation is
/// not in play (update/remove/rebuild never invent new keys).
fn resolve(doc: &Document, def: &IndexDefinition, existing: &[Document]) -> Resolution {
    if def.fields.len() == 1 {
        let field = &def.fields[0];
        return match get_path(doc, &field.path) {
            None => match (&def.gen, def.auto) {
                (Some(gen), true) => {
                    let generated = gen(doc, &field.path, existing);
                    Resolution::Single(IndexKey::single(transform_component(&generated, def), field.order))
                }
                _ => Resolution::Missing,
            },
            Some(Bson::Array(items)) => {
                if items.is_empty() {
                    return Resolution::Missing;
                }
                Resolution::Multi(
                    items.iter().map(|v| IndexKey::single(transform_component(v, def), field.order)).collect(),
                )
            }
            Some(v) => Resolution::Single(IndexKey::single(transform_component(v, def), field.order)),
        };
    }

    let mut components = Vec::with_capacity(def.fields.len());
    let mut any_present = false;
    for field in &def.fields {
        let value = match get_path(doc, &field.path) {
            Some(v) => {
                any_present = true;
                transform_component(v, def)
            }
            None => Bson::Null,
        };
        components.push(KeyComponent::new(value, field.order));
    }
    if !any_present {
        Resolution::Missing
    } else {
        Resolution::Single(IndexKey(components))
    }
}

/// One maintained collection's index set: definitions plus their backing
/// trees (`spec.md` §4.4). The primary-key reference stored per entry is
/// whatever `Bson` value the collection uses as its id.
#[derive(Default)]
pub struct IndexEngine {
    defs: BTreeMap<String, IndexDefinition>,
    trees: BTreeMap<String, OrderedTree<IndexKey, Bson>>,
    wildcard_templates: Vec<IndexDefinition>,
    materialized_fields: BTreeSet<String>,
}

/// What happened as a side effect of an `insert` call.
#[derive(Debug, Default)]
pub struct InsertOutcome {
    /// Names of indexes newly materialized from a wildcard template; the
    /// caller (the collection) still needs to backfill these from its
    /// existing document list via [`IndexEngine::rebuild`].
    pub materialized: Vec<String>,
}

impl IndexEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ensure_index(&mut self, def: IndexDefinition) {
        if def.wildcard {
            self.wildcard_templates.push(def);
            return;
        }
        self.trees.entry(def.name.clone()).or_insert_with(OrderedTree::new);
        for field in &def.fields {
            self.materialized_fields.insert(field.path.clone());
        }
        self.defs.insert(def.name.clone(), def);
    }

    pub fn drop_index(&mut self, name: &str) -> Result<(), IndexError> {
        if self.defs.remove(name).is_none() {
            return Err(IndexError::UnknownIndex { name: name.to_string() });
        }
        self.trees.remove(name);
        Ok(())
    }

    pub fn list_indexes(&self) -> impl Iterator<Item = &IndexDefinition> {
        self.defs.values()
    }

    pub fn get_index(&self, name: &str) -> Option<&OrderedTree<IndexKey, Bson>> {
        self.trees.get(name)
    }

    pub fn get_def(&self, name: &str) -> Option<&IndexDefinition> {
        self.defs.get(name)
    }

    fn validate_unique(&self, def: &IndexDefinition, key: &IndexKey, id: &Bson) -> Result<(), IndexError> {
        if !def.unique {
            return Ok(());
        }
        let tree = &self.trees[&def.name];
        let clashes = tree.find(key).iter().any(|existing| existing != id);
        if clashes {
            return Err(IndexError::UniqueViolation { index: def.name.clone(), field: field_label(def) });
        }
        Ok(())
    }

    /// Insert a new document's id into every maintained index. All-or-nothing:
    /// validated first, then applied, so a unique/required violation leaves
    /// no partial index mutation (`spec.md` §4.4). `existing` backs `auto`/
    /// `gen` index definitions, which synthesize a key from the prior
    /// document list when the field is absent on `doc`.
    pub fn insert(&mut self, doc: &Document, id: &Bson, existing: &[Document]) -> Result<InsertOutcome, IndexError> {
        let defs: Vec<IndexDefinition> = self.defs.values().cloned().collect();
        let mut staged: Vec<(String, Vec<IndexKey>)> = Vec::new();

        for def in &defs {
            match resolve(doc, def, existing) {
                Resolution::Missing => {
                    if def.required && !def.sparse {
                        return Err(IndexError::RequiredFieldMissing { index: def.name.clone(), field: field_label(def) });
                    }
                }
                Resolution::Single(key) => {
                    self.validate_unique(def, &key, id)?;
                    staged.push((def.name.clone(), vec![key]));
                }
                Resolution::Multi(keys) => {
                    for key in &keys {
                        self.validate_unique(def, key, id)?;
                    }
                    staged.push((def.name.clone(), keys));
                }
            }
        }

        for (name, keys) in staged {
            let tree = self.trees.get_mut(&name).expect("index tree exists for every definition");
            for key in keys {
                tree.insert(key, id.clone());
            }
        }

        Ok(InsertOutcome { materialized: self.materialize_wildcards(doc) })
    }

    fn materialize_wildcards(&mut self, doc: &Document) -> Vec<String> {
        if self.wildcard_templates.is_empty() {
            return Vec::new();
        }
        let templates = self.wildcard_templates.clone();
        let mut materialized = Vec::new();
        for (field, _) in doc {
            if self.materialized_fields.contains(field) {
                continue;
            }
            for template in &templates {
                let concrete = template.materialize_for_field(field);
                let name = concrete.name.clone();
                self.ensure_index(concrete);
                materialized.push(name);
            }
            self.materialized_fields.insert(field.clone());
        }
        materialized
    }

    /// Apply a document update: remove stale index entries, insert fresh
    /// ones, skip-only when the new value is absent on a non-sparse index
    /// (`spec.md` §4.4: "If new-key is null and not-sparse, remove only").
    pub fn update(&mut self, old: &Document, new: &Document, id: &Bson) -> Result<(), IndexError> {
        let defs: Vec<IndexDefinition> = self.defs.values().cloned().collect();
        for def in &defs {
            let old_res = resolve(old, def, &[]);
            let new_res = resolve(new, def, &[]);
            if keys_of(&old_res) == keys_of(&new_res) {
                continue;
            }
            for key in keys_of(&old_res) {
                self.remove_key(def, &key, id);
            }
            match new_res {
                Resolution::Missing => {}
                Resolution::Single(key) => {
                    self.validate_unique(def, &key, id)?;
                    self.trees.get_mut(&def.name).unwrap().insert(key, id.clone());
                }
                Resolution::Multi(keys) => {
                    for key in &keys {
                        self.validate_unique(def, key, id)?;
                    }
                    let tree = self.trees.get_mut(&def.name).unwrap();
                    for key in keys {
                        tree.insert(key, id.clone());
                    }
                }
            }
        }
        Ok(())
    }

    fn remove_key(&mut self, def: &IndexDefinition, key: &IndexKey, id: &Bson) {
        let tree = self.trees.get_mut(&def.name).expect("index tree exists for every definition");
        if def.unique {
            tree.remove(key, None);
        } else {
            tree.remove(key, Some(id));
        }
    }

    pub fn remove(&mut self, doc: &Document, id: &Bson) {
        let defs: Vec<IndexDefinition> = self.defs.values().cloned().collect();
        for def in &defs {
            for key in keys_of(&resolve(doc, def, &[])) {
                self.remove_key(def, &key, id);
            }
        }
    }

    /// Rebuild one index from scratch against the full document set, e.g.
    /// after `createIndex` on an existing collection or to backfill a
    /// wildcard-materialized index (`spec.md` §4.4).
    pub fn rebuild<'a>(&mut self, name: &str, docs: impl Iterator<Item = (&'a Document, &'a Bson)>) -> Result<(), IndexError> {
        if !self.defs.contains_key(name) {
            return Err(IndexError::UnknownIndex { name: name.to_string() });
        }
        self.trees.insert(name.to_string(), OrderedTree::new());
        for (doc, id) in docs {
            let def = self.defs[name].clone();
            match resolve(doc, &def, &[]) {
                Resolution::Missing => {
                    if def.required && !def.sparse {
                        return Err(IndexError::RequiredFieldMissing { index: def.name.clone(), field: field_label(&def) });
                    }
                }
                Resolution::Single(key) => {
                    self.validate_unique(&def, &key, id)?;
                    self.trees.get_mut(name).unwrap().insert(key, id.clone());
                }
                Resolution::Multi(keys) => {
                    for key in &keys {
                        self.validate_unique(&def, key, id)?;
                    }
                    let tree = self.trees.get_mut(name).unwrap();
                    for key in keys {
                        tree.insert(key, id.clone());
                    }
                }
            }
        }
        Ok(())
    }
}

fn keys_of(resolution: &Resolution) -> Vec<IndexKey> {
    match resolution {
        Resolution::Missing => Vec::new(),
        Resolution::Single(k) => vec![k.clone()],
        Resolution::Multi(ks) => ks.clone(),
    }
}

fn field_label(def: &IndexDefinition) -> String {
    def.fields.iter().map(|f| f.path.as_str()).collect::<Vec<_>>().join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::def::IndexField;
    use bson::doc;
    use proptest::prelude::*;

    fn id(s: &str) -> Bson {
        Bson::String(s.to_string())
    }

    #[test]
    fn insert_and_unique_lookup() {
        let mut engine = IndexEngine::new();
        engine.ensure_index(IndexDefinition::single("by_name", "name").unique());
        engine.insert(&doc! { "name": "Alice" }, &id("1"), &[]).unwrap();
        let err = engine.insert(&doc! { "name": "Alice" }, &id("2"), &[]).unwrap_err();
        assert!(matches!(err, IndexError::UniqueViolation { .. }));
    }

    #[test]
    fn required_field_missing_aborts_insert() {
        let mut engine = IndexEngine::new();
        engine.ensure_index(IndexDefinition::single("by_email", "email").required());
        let err = engine.insert(&doc! { "name": "Alice" }, &id("1"), &[]).unwrap_err();
        assert!(matches!(err, IndexError::RequiredFieldMissing { .. }));
        assert_eq!(engine.get_index("by_email").unwrap().len(), 0);
    }

    #[test]
    fn update_moves_key() {
        let mut engine = IndexEngine::new();
        engine.ensure_index(IndexDefinition::single("by_age", "age"));
        engine.insert(&doc! { "age": 10 }, &id("1"), &[]).unwrap();
        engine.update(&doc! { "age": 10 }, &doc! { "age": 20 }, &id("1")).unwrap();
        let tree = engine.get_index("by_age").unwrap();
        assert_eq!(tree.len(), 1);
        assert!(tree.find(&IndexKey::single(Bson::Int32(10), SortOrder::Asc)).is_empty());
    }

    #[test]
    fn remove_clears_entries() {
        let mut engine = IndexEngine::new();
        engine.ensure_index(IndexDefinition::single("by_age", "age"));
        engine.insert(&doc! { "age": 10 }, &id("1"), &[]).unwrap();
        engine.remove(&doc! { "age": 10 }, &id("1"));
        assert_eq!(engine.get_index("by_age").unwrap().len(), 0);
    }

    #[test]
    fn array_field_produces_multikey_entries() {
        let mut engine = IndexEngine::new();
        engine.ensure_index(IndexDefinition::single("by_tag", "tags"));
        engine.insert(&doc! { "tags": ["rust", "db"] }, &id("1"), &[]).unwrap();
        assert_eq!(engine.get_index("by_tag").unwrap().len(), 2);
    }

    #[test]
    fn composite_index_keys_respect_field_order() {
        let mut engine = IndexEngine::new();
        engine.ensure_index(IndexDefinition::composite(
            "by_last_first",
            vec![IndexField::asc("last"), IndexField::asc("first")],
        ));
        engine.insert(&doc! { "last": "Doe", "first": "Jane" }, &id("1"), &[]).unwrap();
        assert_eq!(engine.get_index("by_last_first").unwrap().len(), 1);
    }

    #[test]
    fn wildcard_materializes_new_field_index() {
        let mut engine = IndexEngine::new();
        engine.ensure_index(IndexDefinition::wildcard("*"));
        let outcome = engine.insert(&doc! { "color": "red" }, &id("1"), &[]).unwrap();
        assert_eq!(outcome.materialized.len(), 1);
        assert!(engine.get_index(&outcome.materialized[0]).is_some());
    }

    #[test]
    fn wildcard_does_not_rematerialize_a_field_already_covered_by_a_concrete_index() {
        let mut engine = IndexEngine::new();
        engine.ensure_index(IndexDefinition::single("by_id", "id").unique().required());
        engine.ensure_index(IndexDefinition::wildcard("*"));
        let outcome = engine.insert(&doc! { "id": 1, "color": "red" }, &id("1"), &[]).unwrap();
        assert_eq!(outcome.materialized, vec!["*$color".to_string()]);
    }

    #[test]
    fn wildcard_does_not_rematerialize_known_field() {
        let mut engine = IndexEngine::new();
        engine.ensure_index(IndexDefinition::wildcard("*"));
        let first = engine.insert(&doc! { "color": "red" }, &id("1"), &[]).unwrap();
        let second = engine.insert(&doc! { "color": "blue" }, &id("2"), &[]).unwrap();
        assert_eq!(first.materialized.len(), 1);
        assert!(second.materialized.is_empty());
    }

    #[test]
    fn rebuild_reconstructs_from_document_list() {
        let mut engine = IndexEngine::new();
        engine.ensure_index(IndexDefinition::single("by_age", "age"));
        let docs = vec![(doc! { "age": 1 }, id("1")), (doc! { "age": 2 }, id("2"))];
        let borrowed: Vec<(&Document, &Bson)> = docs.iter().map(|(d, i)| (d, i)).collect();
        engine.rebuild("by_age", borrowed.into_iter()).unwrap();
        assert_eq!(engine.get_index("by_age").unwrap().len(), 2);
    }

    #[test]
    fn process_overrides_case_insensitive_lowering() {
        let mut engine = IndexEngine::new();
        engine.ensure_index(IndexDefinition::single("by_code", "code").case_insensitive().process(|v| v.clone()));
        engine.insert(&doc! { "code": "ABC" }, &id("1"), &[]).unwrap();
        let tree = engine.get_index("by_code").unwrap();
        assert!(!tree.find(&IndexKey::single(Bson::String("abc".into()), SortOrder::Asc)).is_empty());
    }

    #[test]
    fn auto_gen_fills_missing_field_on_insert() {
        let mut engine = IndexEngine::new();
        engine.ensure_index(
            IndexDefinition::single("by_slug", "slug")
                .auto_generate(|_item, _name, existing| Bson::String(format!("auto-{}", existing.len()))),
        );
        let existing = vec![doc! { "slug": "first" }];
        engine.insert(&doc! { "title": "no slug" }, &id("1"), &existing).unwrap();
        let tree = engine.get_index("by_slug").unwrap();
        assert!(!tree.find(&IndexKey::single(Bson::String("auto-1".into()), SortOrder::Asc)).is_empty());
    }

    #[test]
    fn missing_field_without_auto_still_resolves_to_missing() {
        let mut engine = IndexEngine::new();
        engine.ensure_index(IndexDefinition::single("by_slug", "slug"));
        engine.insert(&doc! { "title": "no slug" }, &id("1"), &[]).unwrap();
        assert_eq!(engine.get_index("by_slug").unwrap().len(), 0);
    }

    proptest! {
        #[test]
        fn insert_then_remove_restores_empty_index(values in prop::collection::vec(-100i32..100, 0..20)) {
            let mut engine = IndexEngine::new();
            engine.ensure_index(IndexDefinition::single("by_value", "value"));
            let docs: Vec<Document> = values.iter().map(|v| doc! { "value": *v }).collect();
            for (i, d) in docs.iter().enumerate() {
                engine.insert(d, &id(&i.to_string()), &[]).unwrap();
            }
            prop_assert_eq!(engine.get_index("by_value").unwrap().len(), docs.len());
            for (i, d) in docs.iter().enumerate() {
                engine.remove(d, &id(&i.to_string()));
            }
            prop_assert_eq!(engine.get_index("by_value").unwrap().len(), 0);
        }

        #[test]
        fn unique_index_never_holds_more_than_one_id_per_key(values in prop::collection::vec(0i32..5, 1..20)) {
            let mut engine = IndexEngine::new();
            engine.ensure_index(IndexDefinition::single("by_value", "value").unique());
            let mut next_ok_id = 0usize;
            for v in &values {
                let outcome = engine.insert(&doc! { "value": *v }, &id(&next_ok_id.to_string()), &[]);
                if outcome.is_ok() {
                    next_ok_id += 1;
                }
            }
            let tree = engine.get_index("by_value").unwrap();
            for v in &values {
                let key = IndexKey::single(Bson::Int32(*v), SortOrder::Asc);
                prop_assert!(tree.find(&key).len() <= 1);
            }
        }
    }
}
