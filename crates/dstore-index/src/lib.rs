//! B+ tree index engine: single, composite and wildcard indexes over a
//! collection's documents (C4).

mod def;
mod encode;
mod engine;
mod error;
mod key;
mod path;

pub use def::{IndexDefinition, IndexField};
pub use encode::{encode_key, DEFAULT_SEPARATOR};
pub use engine::{IndexEngine, InsertOutcome};
pub use error::IndexError;
pub use key::{IndexKey, KeyComponent, SortOrder};
