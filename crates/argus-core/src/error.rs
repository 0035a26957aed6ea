//! Error types for the ARGUS data model.

use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum ModelError {
    /// A field value failed a domain rule. Raised before any persistence
    /// effect for that field; `field` names the offending column.
    #[error("invalid value for field `{field}`: {message}")]
    Validation { field: String, message: String },

    #[error("no {entity} record has {column} = {value}")]
    NotFound {
        entity: &'static str,
        column: String,
        value: String,
    },

    #[error("more than one {entity} record has {column} = {value}")]
    AmbiguousResult {
        entity: &'static str,
        column: String,
        value: String,
    },

    #[error("{entity} has no field `{field}`")]
    UnknownField { entity: &'static str, field: String },

    #[error("no validator registered for declared column {entity}.{field}")]
    MissingValidator { entity: &'static str, field: String },

    #[error("credential error: {0}")]
    Credential(String),

    #[error("database error: {0}")]
    Database(String),
}

impl ModelError {
    /// The offending field name, if this is a validation failure.
    pub fn invalid_field(&self) -> Option<&str> {
        match self {
            ModelError::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}
