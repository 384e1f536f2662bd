//! Category tree errors
//!
//! Validation and structural errors are raised before the first write of an
//! operation. Store errors may surface after earlier writes succeeded; the
//! repair pass reconciles whatever state was left behind.

use crate::db::RepoError;
use shared::error::{AppError, ErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TreeError {
    /// A referenced category does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// A structural rule was violated (cycle, self reference, non-parentable target)
    #[error("Invalid operation: {1}")]
    InvalidOperation(ErrorCode, String),

    /// A field failed length/format validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// An invariant violation was detected in stored data
    #[error("Consistency fault: {0}")]
    Consistency(String),

    #[error(transparent)]
    Store(#[from] RepoError),
}

impl TreeError {
    pub fn category_not_found(id: i64) -> Self {
        Self::NotFound(format!("Category {id}"))
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(ErrorCode::CategoryInvalidOperation, msg.into())
    }

    /// Error code used when surfacing this error through the API layer
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::CategoryNotFound,
            Self::InvalidOperation(code, _) => *code,
            Self::Validation(_) => ErrorCode::ValidationFailed,
            Self::Consistency(_) => ErrorCode::CategoryConsistencyFault,
            Self::Store(RepoError::Duplicate(_)) => ErrorCode::CategorySlugExists,
            Self::Store(_) => ErrorCode::DatabaseError,
        }
    }
}

impl From<TreeError> for AppError {
    fn from(err: TreeError) -> Self {
        let code = err.code();
        match err {
            TreeError::NotFound(resource) => {
                AppError::with_message(code, format!("{resource} not found"))
                    .with_detail("resource", resource)
            }
            TreeError::InvalidOperation(_, msg)
            | TreeError::Validation(msg)
            | TreeError::Consistency(msg) => AppError::with_message(code, msg),
            TreeError::Store(e) => AppError::with_message(code, e.to_string()),
        }
    }
}

/// Result type for category tree operations
pub type TreeResult<T> = Result<T, TreeError>;
