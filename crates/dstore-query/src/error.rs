use std::fmt;

use bson::Bson;

/// Structural query error raised at parse/compile time (`spec.md` §4.2,
/// §6 error taxonomy: `QueryError{operator, value}`).
#[derive(Debug, Clone, PartialEq)]
pub struct QueryError {
    pub operator: String,
    pub message: String,
    pub value: Option<Bson>,
}

impl QueryError {
    pub fn new(operator: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operator: operator.into(),
            message: message.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: Bson) -> Self {
        self.value = Some(value);
        self
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "query error in {}: {}", self.operator, self.message)
    }
}

impl std::error::Error for QueryError {}
