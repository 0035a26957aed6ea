//! Database-specific error types and conversions.

use argus_core::ModelError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),
}

impl From<DbError> for ModelError {
    fn from(err: DbError) -> Self {
        ModelError::Database(err.to_string())
    }
}
