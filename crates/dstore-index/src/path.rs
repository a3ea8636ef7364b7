use bson::{Bson, Document};

/// Resolve a dotted field path inside a document, without descending into
/// arrays (array expansion for multikey indexes is handled by the caller).
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
