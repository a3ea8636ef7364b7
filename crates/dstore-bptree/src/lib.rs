//! An ordered, serializable multimap used as the collaborator behind every
//! index in `dstore-index` (B+ tree per `spec.md` §4.4).
//!
//! Grounded on `slate-engine/src/index/mod.rs`'s key -> doc_id mapping and on
//! the `prataprc-rdms` pattern of a small `Bptree` trait with one in-memory
//! implementation swapped in behind it. Keys carry their own `Ord`; index
//! composite-key encoding (separator/escape byte strings) lives one layer up
//! in `dstore-index`, which is the only caller of this crate.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordered multimap: each key may hold more than one value, in insertion
/// order, matching non-unique index semantics (`spec.md` §4.4 "non-unique ->
/// remove only the entry whose ref matches").
pub trait BPlusTree<K, V> {
    fn insert(&mut self, key: K, value: V);
    /// Remove one matching `(key, value)` pair. Returns `true` if a value was
    /// removed. If `value` is `None`, removes every value under `key`.
    fn remove(&mut self, key: &K, value: Option<&V>) -> bool;
    fn find(&self, key: &K) -> &[V];
    fn find_first(&self, key: &K) -> Option<&V>;
    fn find_last(&self, key: &K) -> Option<&V>;
    fn min(&self) -> Option<(&K, &V)>;
    fn max(&self) -> Option<(&K, &V)>;
    /// Inclusive-bounds range scan over keys, ascending.
    fn range<'a>(&'a self, lower: Option<&K>, upper: Option<&K>) -> Box<dyn Iterator<Item = (&'a K, &'a V)> + 'a>;
    /// Full ascending iteration.
    fn iterate<'a>(&'a self) -> Box<dyn Iterator<Item = (&'a K, &'a V)> + 'a>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `BTreeMap`-backed [`BPlusTree`] implementation. Multiple values per key
/// are kept in a `Vec` so insertion order within a key is preserved, matching
/// `find_first`/`find_last` semantics used by the collection layer's
/// `first(key)`/`last(key)` operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderedTree<K, V>
where
    K: Ord,
{
    entries: BTreeMap<K, Vec<V>>,
    #[serde(skip)]
    count: usize,
}

impl<K, V> Default for OrderedTree<K, V>
where
    K: Ord,
{
    fn default() -> Self {
        OrderedTree { entries: BTreeMap::new(), count: 0 }
    }
}

impl<K, V> OrderedTree<K, V>
where
    K: Ord,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute the cached length after deserialization (the field is
    /// `#[serde(skip)]`'d since it's a pure derived value).
    fn recount(&mut self) {
        self.count = self.entries.values().map(|v| v.len()).sum();
    }
}

impl<K, V> BPlusTree<K, V> for OrderedTree<K, V>
where
    K: Ord + Clone,
    V: PartialEq,
{
    fn insert(&mut self, key: K, value: V) {
        self.entries.entry(key).or_default().push(value);
        self.count += 1;
    }

    fn remove(&mut self, key: &K, value: Option<&V>) -> bool {
        let Some(values) = self.entries.get_mut(key) else { return false };
        let removed = match value {
            None => {
                let n = values.len();
                values.clear();
                n > 0
            }
            Some(v) => {
                if let Some(pos) = values.iter().position(|existing| existing == v) {
                    values.remove(pos);
                    true
                } else {
                    false
                }
            }
        };
        if values.is_empty() {
            self.entries.remove(key);
        }
        if removed {
            self.count -= 1;
        }
        removed
    }

    fn find(&self, key: &K) -> &[V] {
        self.entries.get(key).map(|v| v.as_slice()).unwrap_or(&[])
    }

    fn find_first(&self, key: &K) -> Option<&V> {
        self.entries.get(key).and_then(|v| v.first())
    }

    fn find_last(&self, key: &K) -> Option<&V> {
        self.entries.get(key).and_then(|v| v.last())
    }

    fn min(&self) -> Option<(&K, &V)> {
        self.entries.iter().next().and_then(|(k, vs)| vs.first().map(|v| (k, v)))
    }

    fn max(&self) -> Option<(&K, &V)> {
        self.entries.iter().next_back().and_then(|(k, vs)| vs.last().map(|v| (k, v)))
    }

    fn range<'a>(&'a self, lower: Option<&K>, upper: Option<&K>) -> Box<dyn Iterator<Item = (&'a K, &'a V)> + 'a> {
        use std::ops::Bound;
        let lower_bound = lower.map(|k| Bound::Included(k.clone())).unwrap_or(Bound::Unbounded);
        let upper_bound = upper.map(|k| Bound::Included(k.clone())).unwrap_or(Bound::Unbounded);
        Box::new(
            self.entries
                .range((lower_bound, upper_bound))
                .flat_map(|(k, vs)| vs.iter().map(move |v| (k, v))),
        )
    }

    fn iterate<'a>(&'a self) -> Box<dyn Iterator<Item = (&'a K, &'a V)> + 'a> {
        Box::new(self.entries.iter().flat_map(|(k, vs)| vs.iter().map(move |v| (k, v))))
    }

    fn len(&self) -> usize {
        self.count
    }
}

impl<K, V> fmt::Display for OrderedTree<K, V>
where
    K: Ord + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OrderedTree({} keys)", self.entries.len())
    }
}

/// Serialize a tree's entries to a portable snapshot form used by
/// `dstore-storage`'s `SerializedTree` (`spec.md` §4.6).
pub fn to_snapshot<K, V>(tree: &OrderedTree<K, V>) -> Vec<(K, Vec<V>)>
where
    K: Ord + Clone,
    V: Clone,
{
    tree.entries.iter().map(|(k, vs)| (k.clone(), vs.clone())).collect()
}

/// Rebuild a tree from a snapshot produced by [`to_snapshot`].
pub fn from_snapshot<K, V>(entries: Vec<(K, Vec<V>)>) -> OrderedTree<K, V>
where
    K: Ord,
{
    let mut tree = OrderedTree::new();
    tree.entries = entries.into_iter().collect();
    tree.recount();
    tree
}
