use bson::{Bson, Document};

/// Resolve a dotted path to the value at that path, stopping at (not
/// descending into) arrays — schema paths describe document shape, not
/// per-element array shape. Mirrors the document side of
/// `dstore_query::eval`'s path resolver, without the array-broadcast half.
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut parts = path.split('.');
    let first = parts.next()?;
    let mut value = doc.get(first)?;
    for part in parts {
        match value {
            Bson::Document(d) => value = d.get(part)?,
            _ => return None,
        }
    }
    Some(value)
}

/// Set a dotted path in `doc`, creating intermediate documents as needed.
pub fn set_path(doc: &mut Document, path: &str, value: Bson) {
    let parts: Vec<&str> = path.split('.').collect();
    set_path_rec(doc, &parts, value);
}

fn set_path_rec(doc: &mut Document, parts: &[&str], value: Bson) {
    match parts {
        [] => {}
        [last] => {
            doc.insert(*last, value);
        }
        [head, rest @ ..] => {
            let entry = doc
                .entry(head.to_string())
                .or_insert_with(|| Bson::Document(Document::new()));
            if !matches!(entry, Bson::Document(_)) {
                *entry = Bson::Document(Document::new());
            }
            if let Bson::Document(inner) = entry {
                set_path_rec(inner, rest, value);
            }
        }
    }
}

/// Flatten a document into dotted-path -> value pairs, stopping at arrays and
/// leaf scalars. Used by schema inference.
pub fn flatten(doc: &Document, prefix: &str, out: &mut Vec<(String, Bson)>) {
    for (k, v) in doc {
        let path = if prefix.is_empty() { k.clone() } else { format!("{prefix}.{k}") };
        match v {
            Bson::Document(d) => flatten(d, &path, out),
            other => out.push((path, other.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn get_nested() {
        let d = doc! { "a": { "b": 5 } };
        assert_eq!(get_path(&d, "a.b"), Some(&Bson::Int32(5)));
    }

    #[test]
    fn get_missing() {
        let d = doc! { "a": 1 };
        assert_eq!(get_path(&d, "a.b"), None);
    }

    #[test]
    fn set_creates_intermediate() {
        let mut d = Document::new();
        set_path(&mut d, "a.b.c", Bson::Int32(1));
        assert_eq!(get_path(&d, "a.b.c"), Some(&Bson::Int32(1)));
    }

    #[test]
    fn flatten_nested() {
        let d = doc! { "a": { "b": 1, "c": 2 }, "d": 3 };
        let mut out = Vec::new();
        flatten(&d, "", &mut out);
        out.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(out, vec![
            ("a.b".to_string(), Bson::Int32(1)),
            ("a.c".to_string(), Bson::Int32(2)),
            ("d".to_string(), Bson::Int32(3)),
        ]);
    }
}
