use bson::{Bson, Document};

/// Apply `patch` onto `base`. `merge=true` performs a recursive deep-merge of
/// nested objects and arrays; `merge=false` performs a shallow top-level
/// assign (`spec.md` §4.5).
pub fn apply_patch(base: &Document, patch: &Document, merge: bool) -> Document {
    if !merge {
        let mut result = base.clone();
        for (k, v) in patch {
            result.insert(k.clone(), v.clone());
        }
        return result;
    }
    deep_merge_documents(base, patch)
}

fn deep_merge_documents(base: &Document, patch: &Document) -> Document {
    let mut result = base.clone();
    for (k, v) in patch {
        let merged = match (result.get(k), v) {
            (Some(Bson::Document(existing)), Bson::Document(incoming)) => {
                Bson::Document(deep_merge_documents(existing, incoming))
            }
            (Some(Bson::Array(existing)), Bson::Array(incoming)) => Bson::Array(deep_merge_arrays(existing, incoming)),
            _ => v.clone(),
        };
        result.insert(k.clone(), merged);
    }
    result
}

/// Arrays merge element-by-index: overlapping positions recurse, and any
/// extra incoming elements extend the array.
fn deep_merge_arrays(base: &[Bson], patch: &[Bson]) -> Vec<Bson> {
    let mut result = Vec::with_capacity(base.len().max(patch.len()));
    for i in 0..base.len().max(patch.len()) {
        match (base.get(i), patch.get(i)) {
            (Some(Bson::Document(b)), Some(Bson::Document(p))) => result.push(Bson::Document(deep_merge_documents(b, p))),
            (Some(Bson::Array(b)), Some(Bson::Array(p))) => result.push(Bson::Array(deep_merge_arrays(b, p))),
            (_, Some(p)) => result.push(p.clone()),
            (Some(b), None) => result.push(b.clone()),
            (None, None) => {}
        }
    }
    result
}
