use std::fmt;

use dstore_collection::CollectionError;
use dstore_storage::StorageError;
use dstore_wal::WalError;

#[derive(Debug)]
pub enum DbError {
    Collection(CollectionError),
    Storage(StorageError),
    Wal(WalError),
    Io(std::io::Error),
    Serde(serde_json::Error),
    UnknownCollection { name: String },
    CollectionExists { name: String },
    UnknownTransaction { id: String },
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbError::Collection(e) => write!(f, "{e}"),
            DbError::Storage(e) => write!(f, "{e}"),
            DbError::Wal(e) => write!(f, "{e}"),
            DbError::Io(e) => write!(f, "{e}"),
            DbError::Serde(e) => write!(f, "{e}"),
            DbError::UnknownCollection { name } => write!(f, "no collection named '{name}'"),
            DbError::CollectionExists { name } => write!(f, "collection '{name}' already exists"),
            DbError::UnknownTransaction { id } => write!(f, "no open transaction '{id}'"),
        }
    }
}

impl std::error::Error for DbError {}

impl From<CollectionError> for DbError {
    fn from(e: CollectionError) -> Self {
        DbError::Collection(e)
    }
}

impl From<StorageError> for DbError {
    fn from(e: StorageError) -> Self {
        DbError::Storage(e)
    }
}

impl From<WalError> for DbError {
    fn from(e: WalError) -> Self {
        DbError::Wal(e)
    }
}

impl From<std::io::Error> for DbError {
    fn from(e: std::io::Error) -> Self {
        DbError::Io(e)
    }
}

impl From<serde_json::Error> for DbError {
    fn from(e: serde_json::Error) -> Self {
        DbError::Serde(e)
    }
}
