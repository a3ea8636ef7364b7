use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaError {
    Required { path: String },
    TypeMismatch { path: String, expected: String, found: String },
    Custom { path: String, message: String },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::Required { path } => write!(f, "field '{path}' is required"),
            SchemaError::TypeMismatch { path, expected, found } => {
                write!(f, "field '{path}' expected type {expected}, found {found}")
            }
            SchemaError::Custom { path, message } => write!(f, "field '{path}': {message}"),
        }
    }
}

impl std::error::Error for SchemaError {}

/// `spec.md` §6 error taxonomy: `ValidationError`.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub errors: Vec<SchemaError>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "document failed validation: ")?;
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}
