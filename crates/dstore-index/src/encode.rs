use crate::key::IndexKey;

/// Default separator joining composite key components, overridable per index
/// via `IndexDefinition::separator` (`spec.md` §6's `IndexDef.separator`).
pub const DEFAULT_SEPARATOR: char = '\u{1}';
const ESC: char = '\\';

/// Encode a key as an escaped, separator-joined string, for use as a map key
/// in JSON snapshot output (`spec.md` §4.6's `SerializedTree`). Grounded on
/// `slate-engine/src/key.rs`'s separator-byte key layout, generalized from
/// raw bytes to one escaped segment per key component since the destination
/// here is a JSON object key rather than an LSM byte key.
pub fn encode_key(key: &IndexKey, separator: char) -> String {
    key.0
        .iter()
        .map(|c| escape(&format!("{:?}", c.value), separator))
        .collect::<Vec<_>>()
        .join(&separator.to_string())
}

fn escape(s: &str, separator: char) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if ch == ESC || ch == separator {
            out.push(ESC);
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{KeyComponent, SortOrder};
    use bson::Bson;

    #[test]
    fn single_component_encodes_without_separator() {
        let key = IndexKey::single(Bson::Int32(5), SortOrder::Asc);
        assert!(!encode_key(&key, DEFAULT_SEPARATOR).contains(DEFAULT_SEPARATOR));
    }

    #[test]
    fn composite_components_are_joined_and_distinct() {
        let a = IndexKey(vec![
            KeyComponent::new(Bson::String("a".into()), SortOrder::Asc),
            KeyComponent::new(Bson::String("b".into()), SortOrder::Asc),
        ]);
        let b = IndexKey(vec![
            KeyComponent::new(Bson::String("ab".into()), SortOrder::Asc),
            KeyComponent::new(Bson::String("".into()), SortOrder::Asc),
        ]);
        assert_ne!(encode_key(&a, DEFAULT_SEPARATOR), encode_key(&b, DEFAULT_SEPARATOR));
    }

    #[test]
    fn custom_separator_changes_encoding() {
        let key = IndexKey(vec![
            KeyComponent::new(Bson::String("a".into()), SortOrder::Asc),
            KeyComponent::new(Bson::String("b".into()), SortOrder::Asc),
        ]);
        assert_ne!(encode_key(&key, DEFAULT_SEPARATOR), encode_key(&key, '|'));
    }
}
