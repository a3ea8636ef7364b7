use std::fmt;
use std::sync::Arc;

use bson::{Bson, Document};

use crate::encode::DEFAULT_SEPARATOR;
use crate::key::SortOrder;

/// One field inside a (possibly composite) index.
#[derive(Debug, Clone)]
pub struct IndexField {
    pub path: String,
    pub order: SortOrder,
}

impl IndexField {
    pub fn asc(path: impl Into<String>) -> Self {
        IndexField { path: path.into(), order: SortOrder::Asc }
    }

    pub fn desc(path: impl Into<String>) -> Self {
        IndexField { path: path.into(), order: SortOrder::Desc }
    }
}

/// An index definition, either over a fixed field set or a wildcard template
/// that materializes concrete definitions as new field names are observed
/// (`spec.md` §4.4).
#[derive(Clone)]
pub struct IndexDefinition {
    pub name: String,
    pub fields: Vec<IndexField>,
    pub unique: bool,
    pub sparse: bool,
    pub required: bool,
    pub case_insensitive: bool,
    pub wildcard: bool,
    /// Reserved separator used to join composite key components when
    /// rendering the on-disk `SerializedTree` form (`spec.md` §6's
    /// `IndexDef.separator`, default NUL-equivalent). `None` means
    /// [`crate::encode::DEFAULT_SEPARATOR`].
    pub separator: Option<char>,
    /// Whether a missing field on this (single-field) index is filled in by
    /// `gen` rather than left absent (`spec.md` §6's `IndexDef.auto`).
    pub auto: bool,
    /// Generator invoked when `auto` is set and the field is missing on
    /// insert: `(item, field path, existing documents) -> key value`
    /// (`spec.md` §6's `gen: (item, name, list) -> key`). The generated value
    /// keys the index entry; it is not written back into the document.
    pub gen: Option<Arc<dyn Fn(&Document, &str, &[Document]) -> Bson + Send + Sync>>,
    /// Custom value -> key transform applied to the extracted field value
    /// before it becomes (part of) a key, in place of the default
    /// case-insensitive lowering (`spec.md` §6's `process: (item|value) -> key`).
    pub process: Option<Arc<dyn Fn(&Bson) -> Bson + Send + Sync>>,
}

impl fmt::Debug for IndexDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexDefinition")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("unique", &self.unique)
            .field("sparse", &self.sparse)
            .field("required", &self.required)
            .field("case_insensitive", &self.case_insensitive)
            .field("wildcard", &self.wildcard)
            .field("separator", &self.separator)
            .field("auto", &self.auto)
            .field("gen", &self.gen.is_some())
            .field("process", &self.process.is_some())
            .finish()
    }
}

impl IndexDefinition {
    pub fn single(name: impl Into<String>, path: impl Into<String>) -> Self {
        IndexDefinition {
            name: name.into(),
            fields: vec![IndexField::asc(path)],
            unique: false,
            sparse: false,
            required: false,
            case_insensitive: false,
            wildcard: false,
            separator: None,
            auto: false,
            gen: None,
            process: None,
        }
    }

    pub fn composite(name: impl Into<String>, fields: Vec<IndexField>) -> Self {
        IndexDefinition {
            name: name.into(),
            fields,
            unique: false,
            sparse: false,
            required: false,
            case_insensitive: false,
            wildcard: false,
            separator: None,
            auto: false,
            gen: None,
            process: None,
        }
    }

    pub fn wildcard(name: impl Into<String>) -> Self {
        IndexDefinition {
            name: name.into(),
            fields: Vec::new(),
            unique: false,
            sparse: true,
            required: false,
            case_insensitive: true,
            wildcard: true,
            separator: None,
            auto: false,
            gen: None,
            process: None,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn sparse(mut self) -> Self {
        self.sparse = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    pub fn separator(mut self, sep: char) -> Self {
        self.separator = Some(sep);
        self
    }

    /// Effective separator character used to join composite key components.
    pub fn effective_separator(&self) -> char {
        self.separator.unwrap_or(DEFAULT_SEPARATOR)
    }

    /// Mark this (single-field) index `auto`, filling in missing values on
    /// insert via `gen(item, field_path, existing_documents)`.
    pub fn auto_generate(mut self, gen: impl Fn(&Document, &str, &[Document]) -> Bson + Send + Sync + 'static) -> Self {
        self.auto = true;
        self.gen = Some(Arc::new(gen));
        self
    }

    pub fn process(mut self, f: impl Fn(&Bson) -> Bson + Send + Sync + 'static) -> Self {
        self.process = Some(Arc::new(f));
        self
    }

    /// Instantiate a concrete, single-field definition from this wildcard
    /// template for an observed field name (`spec.md` §4.4: "dynamically
    /// synthesize a non-unique, non-required, case-insensitive definition").
    pub fn materialize_for_field(&self, field: &str) -> IndexDefinition {
        debug_assert!(self.wildcard);
        IndexDefinition {
            name: format!("{}${}", self.name, field),
            fields: vec![IndexField::asc(field)],
            unique: false,
            sparse: true,
            required: false,
            case_insensitive: true,
            wildcard: false,
            separator: self.separator,
            auto: self.auto,
            gen: self.gen.clone(),
            process: self.process.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_generate_sets_auto_and_gen() {
        let def = IndexDefinition::single("by_slug", "slug")
            .auto_generate(|item, _name, existing| Bson::String(format!("slug-{}", existing.len() + item.len())));
        assert!(def.auto);
        assert!(def.gen.is_some());
    }

    #[test]
    fn process_overrides_default_transform() {
        let def = IndexDefinition::single("by_email", "email").process(|v| v.clone());
        assert!(def.process.is_some());
    }

    #[test]
    fn separator_defaults_and_overrides() {
        let def = IndexDefinition::single("by_name", "name");
        assert_eq!(def.effective_separator(), DEFAULT_SEPARATOR);
        let with_sep = def.separator('|');
        assert_eq!(with_sep.effective_separator(), '|');
    }

    #[test]
    fn materialize_for_field_carries_process_and_separator() {
        let template = IndexDefinition::wildcard("*").separator('|').process(|v| v.clone());
        let materialized = template.materialize_for_field("color");
        assert_eq!(materialized.effective_separator(), '|');
        assert!(materialized.process.is_some());
        assert_eq!(materialized.fields[0].path, "color");
    }

    #[test]
    fn materialize_for_field_inherits_auto_flag() {
        let template = IndexDefinition::wildcard("*");
        assert!(!template.materialize_for_field("color").auto);
        let auto_template = template.auto_generate(|_, _, _| Bson::Null);
        assert!(auto_template.materialize_for_field("color").auto);
    }
}
