use bson::Document;
use dstore_value::tag_of;

use crate::path::flatten;
use crate::validate::{FieldSchema, Schema};

/// Infer a [`Schema`] from a sample of documents: collects the union of
/// observed tags per dotted path and marks a field required only if it was
/// present in every sample. Coercion and custom validators are never
/// inferred — they require domain knowledge the sample doesn't carry.
pub fn infer_schema(samples: &[Document]) -> Schema {
    let mut per_path: std::collections::BTreeMap<String, (Vec<dstore_value::BsonTag>, usize)> =
        std::collections::BTreeMap::new();

    for doc in samples {
        let mut flat = Vec::new();
        flatten(doc, "", &mut flat);
        for (path, value) in flat {
            let tag = tag_of(&value);
            let entry = per_path.entry(path).or_insert_with(|| (Vec::new(), 0));
            if !entry.0.contains(&tag) {
                entry.0.push(tag);
            }
            entry.1 += 1;
        }
    }

    let total = samples.len();
    let mut schema = Schema::new();
    for (path, (mut tags, count)) in per_path {
        tags.sort_by_key(|t| format!("{t:?}"));
        let mut field = FieldSchema::new(tags);
        if total > 0 && count == total {
            field = field.required();
        }
        schema = schema.field(path, field);
    }
    schema
}
