//! Catalog domain errors.

use thiserror::Error;

/// Errors raised while compiling or executing catalog searches.
///
/// Everything except [`CatalogError::Database`] and [`CatalogError::RowDecode`]
/// is caused by the caller's parameters and surfaces as a client error.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Mutually exclusive search parameters were both supplied.
    #[error("invalid parameter combination: {0}")]
    InvalidParameterCombination(String),

    /// Malformed or degenerate bounding box.
    #[error("{0} is not a valid bbox")]
    InvalidBoundingBox(String),

    /// Unknown (or inapplicable) property query operator.
    #[error("unsupported operator '{operator}' for property '{property}'")]
    UnsupportedOperator { property: String, operator: String },

    /// Operator applied to a value of the wrong shape.
    #[error("invalid value for '{property}': {reason}")]
    InvalidQueryValue { property: String, reason: String },

    /// Timestamp or interval that could not be parsed.
    #[error("invalid datetime '{0}'")]
    InvalidDatetime(String),

    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("failed to decode catalog row")]
    RowDecode(#[from] serde_json::Error),
}

impl CatalogError {
    /// Whether this error was caused by the request rather than the store.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, CatalogError::Database(_) | CatalogError::RowDecode(_))
    }

    /// Machine-readable code used in error responses.
    pub fn code(&self) -> &'static str {
        match self {
            CatalogError::InvalidParameterCombination(_) => "InvalidParameterCombination",
            CatalogError::InvalidBoundingBox(_) => "InvalidBoundingBoxError",
            CatalogError::UnsupportedOperator { .. } => "UnsupportedOperator",
            CatalogError::InvalidQueryValue { .. } => "InvalidQueryValue",
            CatalogError::InvalidDatetime(_) => "InvalidDatetime",
            CatalogError::Database(_) | CatalogError::RowDecode(_) => "InternalError",
        }
    }
}

/// Result alias for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;
