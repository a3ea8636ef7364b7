use std::fmt;

use dstore_index::IndexError;
use dstore_schema::{SchemaError, ValidationError};
use dstore_storage::StorageError;
use dstore_wal::WalError;

#[derive(Debug)]
pub enum CollectionError {
    Validation(ValidationError),
    Index(IndexError),
    Storage(StorageError),
    Wal(WalError),
    DuplicateId { id: String },
    NotFound { id: String },
}

impl fmt::Display for CollectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionError::Validation(e) => write!(f, "{e}"),
            CollectionError::Index(e) => write!(f, "{e}"),
            CollectionError::Storage(e) => write!(f, "{e}"),
            CollectionError::Wal(e) => write!(f, "{e}"),
            CollectionError::DuplicateId { id } => write!(f, "document with id '{id}' already exists"),
            CollectionError::NotFound { id } => write!(f, "no document with id '{id}'"),
        }
    }
}

impl std::error::Error for CollectionError {}

impl From<IndexError> for CollectionError {
    fn from(e: IndexError) -> Self {
        CollectionError::Index(e)
    }
}

impl From<StorageError> for CollectionError {
    fn from(e: StorageError) -> Self {
        CollectionError::Storage(e)
    }
}

impl From<WalError> for CollectionError {
    fn from(e: WalError) -> Self {
        CollectionError::Wal(e)
    }
}

impl From<Vec<SchemaError>> for CollectionError {
    fn from(errors: Vec<SchemaError>) -> Self {
        CollectionError::Validation(ValidationError { errors })
    }
}
