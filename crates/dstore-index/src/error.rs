use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum IndexError {
    UniqueViolation { index: String, field: String },
    RequiredFieldMissing { index: String, field: String },
    UnknownIndex { name: String },
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexError::UniqueViolation { index, field } => {
                write!(f, "unique index '{index}' violated on field '{field}'")
            }
            IndexError::RequiredFieldMissing { index, field } => {
                write!(f, "index '{index}' requires field '{field}'")
            }
            IndexError::UnknownIndex { name } => write!(f, "no index named '{name}'"),
        }
    }
}

impl std::error::Error for IndexError {}
