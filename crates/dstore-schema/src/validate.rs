use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use bson::{Bson, Document};
use dstore_value::{tag_of, BsonTag};

use crate::coerce::coerce;
use crate::error::SchemaError;
use crate::path::{get_path, set_path};

/// Per-field rules, keyed by dotted path in the owning [`Schema`].
///
/// Grounded on `slate-engine/src/validate.rs`'s field-descriptor shape,
/// generalized from its fixed scalar/array/object split to the tag set in
/// `dstore-value` and to the coercion table in `spec.md` §4.
#[derive(Clone)]
pub struct FieldSchema {
    pub types: Vec<BsonTag>,
    pub required: bool,
    pub default: Option<Bson>,
    pub coerce: bool,
    /// When `true`, a type mismatch that cannot be coerced is an error
    /// rather than a warning.
    pub strict: bool,
    pub validator: Option<Arc<dyn Fn(&Bson) -> Result<(), String> + Send + Sync>>,
}

impl fmt::Debug for FieldSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSchema")
            .field("types", &self.types)
            .field("required", &self.required)
            .field("default", &self.default)
            .field("coerce", &self.coerce)
            .field("strict", &self.strict)
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

impl Default for FieldSchema {
    fn default() -> Self {
        FieldSchema {
            types: Vec::new(),
            required: false,
            default: None,
            coerce: false,
            strict: true,
            validator: None,
        }
    }
}

impl FieldSchema {
    pub fn new(types: Vec<BsonTag>) -> Self {
        FieldSchema { types, ..Default::default() }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: Bson) -> Self {
        self.default = Some(value);
        self
    }

    pub fn coercible(mut self) -> Self {
        self.coerce = true;
        self
    }

    pub fn lenient(mut self) -> Self {
        self.strict = false;
        self
    }

    pub fn validator(mut self, f: impl Fn(&Bson) -> Result<(), String> + Send + Sync + 'static) -> Self {
        self.validator = Some(Arc::new(f));
        self
    }

    fn matches_type(&self, value: &Bson) -> bool {
        self.types.is_empty() || self.types.contains(&tag_of(value))
    }
}

/// A document schema: dotted field path -> [`FieldSchema`].
///
/// Grounded on `slate-db/src/encoding.rs`'s per-collection field table.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub fields: BTreeMap<String, FieldSchema>,
}

impl Schema {
    pub fn new() -> Self {
        Schema::default()
    }

    pub fn field(mut self, path: impl Into<String>, schema: FieldSchema) -> Self {
        self.fields.insert(path.into(), schema);
        self
    }
}

/// Outcome of validating one document against a [`Schema`].
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub valid: bool,
    /// The document with defaults applied and coercions substituted in.
    pub processed: Document,
    pub errors: Vec<SchemaError>,
    pub warnings: Vec<String>,
}

/// Validate (and, where requested, coerce/default-fill) `doc` against
/// `schema`. Mirrors `slate-engine/src/validate.rs`'s `validate_doc` pass:
/// one field at a time, short-circuiting nothing so every violation is
/// collected before returning.
pub fn validate_document(schema: &Schema, doc: &Document) -> ValidationOutcome {
    let mut processed = doc.clone();
    let mut errors = Vec::new();
    let warnings = Vec::new();

    for (path, field) in &schema.fields {
        match get_path(doc, path) {
            None => {
                if let Some(default) = &field.default {
                    set_path(&mut processed, path, default.clone());
                } else if field.required {
                    errors.push(SchemaError::Required { path: path.clone() });
                }
            }
            Some(value) => {
                let mut effective = value.clone();
                if !field.matches_type(&effective) {
                    match coerce(&effective, &field.types) {
                        Some(coerced) if field.coerce => {
                            effective = coerced;
                            set_path(&mut processed, path, effective.clone());
                        }
                        _ => {
                            errors.push(SchemaError::TypeMismatch {
                                path: path.clone(),
                                expected: format!("{:?}", field.types),
                                found: format!("{:?}", tag_of(&effective)),
                            });
                            continue;
                        }
                    }
                }
                if let Some(validator) = &field.validator {
                    if let Err(message) = validator(&effective) {
                        errors.push(SchemaError::Custom { path: path.clone(), message });
                    }
                }
            }
        }
    }

    ValidationOutcome { valid: errors.is_empty(), processed, errors, warnings }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn required_field_missing_is_error() {
        let schema = Schema::new().field("name", FieldSchema::new(vec![BsonTag::String]).required());
        let outcome = validate_document(&schema, &doc! {});
        assert!(!outcome.valid);
        assert_eq!(outcome.errors.len(), 1);
    }

    #[test]
    fn default_applied_when_missing() {
        let schema = Schema::new().field("active", FieldSchema::new(vec![BsonTag::Bool]).default_value(Bson::Boolean(true)));
        let outcome = validate_document(&schema, &doc! {});
        assert!(outcome.valid);
        assert_eq!(outcome.processed.get_bool("active").unwrap(), true);
    }

    #[test]
    fn coercion_substitutes_value() {
        let schema = Schema::new().field("age", FieldSchema::new(vec![BsonTag::Int]).coercible());
        let outcome = validate_document(&schema, &doc! { "age": "42" });
        assert!(outcome.valid);
        assert_eq!(outcome.processed.get_i32("age").unwrap(), 42);
    }

    #[test]
    fn mismatch_without_coercion_is_error() {
        let schema = Schema::new().field("age", FieldSchema::new(vec![BsonTag::Int]));
        let outcome = validate_document(&schema, &doc! { "age": "42" });
        assert!(!outcome.valid);
    }

    #[test]
    fn custom_validator_runs_after_coercion() {
        let schema = Schema::new().field(
            "age",
            FieldSchema::new(vec![BsonTag::Int]).coercible().validator(|v| {
                if v.as_i32().unwrap_or(0) >= 0 {
                    Ok(())
                } else {
                    Err("must be non-negative".to_string())
                }
            }),
        );
        let outcome = validate_document(&schema, &doc! { "age": -1 });
        assert!(!outcome.valid);
    }
}
