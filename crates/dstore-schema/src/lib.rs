//! Document schema definition, validation, coercion, and inference (C8).

mod coerce;
mod error;
mod infer;
mod path;
mod query_validate;
mod validate;

pub use coerce::coerce;
pub use error::{SchemaError, ValidationError};
pub use infer::infer_schema;
pub use path::{flatten, get_path, set_path};
pub use query_validate::{validate_query, QueryValidation};
pub use validate::{validate_document, FieldSchema, Schema, ValidationOutcome};
