//! Error types for the TCA workspace.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the TCA workspace.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data error (invalid or inconsistent data).
    #[error("Data error: {0}")]
    Data(String),

    /// A required input field was absent.
    #[error("Missing field '{column}' in {source_name} row {row}")]
    MissingField {
        source_name: String,
        row: usize,
        column: String,
    },

    /// Database / columnar file error.
    #[error("Database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }

    /// Create a missing-field error.
    pub fn missing_field(source_name: impl Into<String>, row: usize, column: impl Into<String>) -> Self {
        Error::MissingField {
            source_name: source_name.into(),
            row,
            column: column.into(),
        }
    }

    /// Create a database error.
    pub fn database(msg: impl Into<String>) -> Self {
        Error::Database(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_message() {
        let err = Error::missing_field("executions", 3, "Price");
        assert_eq!(err.to_string(), "Missing field 'Price' in executions row 3");
    }
}
