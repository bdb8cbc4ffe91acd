//! Unified error type for data layer

use thiserror::Error;

use crate::data::sqlite::SqliteError;

/// Unified error type for data layer operations
#[derive(Error, Debug)]
pub enum DataError {
    /// SQLite backend error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] SqliteError),

    /// Direct sqlx driver error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_error_display() {
        let err = DataError::Database(sqlx::Error::RowNotFound);
        assert!(err.to_string().starts_with("Database error"));
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: DataError = io_err.into();
        assert!(err.to_string().contains("missing"));
    }
}
