//! Error codes for the category hierarchy
//!
//! - 0xxx: General errors
//! - 6xxx: Catalog errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error code carried by every [`AppError`](super::AppError)
///
/// Serialized as its u16 value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// A name or description failed field validation
    ValidationFailed = 2,

    // ==================== 6xxx: Catalog ====================
    CategoryNotFound = 6101,
    /// Slug collided with another record at the store
    CategorySlugExists = 6103,
    /// Structural rule violated (cycle, self reference)
    CategoryInvalidOperation = 6104,
    /// Tree invariant violation detected by verification
    CategoryConsistencyFault = 6105,
    /// Delete rejected because the category still has children
    CategoryHasChildren = 6106,
    /// Target category does not accept children
    CategoryNotParentable = 6107,

    // ==================== 9xxx: System ====================
    DatabaseError = 9002,
}

impl ErrorCode {
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Short English description of the code
    pub const fn message(&self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::CategoryNotFound => "Category not found",
            ErrorCode::CategorySlugExists => "Category slug already exists",
            ErrorCode::CategoryInvalidOperation => "Invalid category hierarchy operation",
            ErrorCode::CategoryConsistencyFault => "Category tree is inconsistent",
            ErrorCode::CategoryHasChildren => "Category has child categories",
            ErrorCode::CategoryNotParentable => "Category cannot have child categories",
            ErrorCode::DatabaseError => "Database error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Returned when a u16 does not name an [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(ErrorCode::ValidationFailed),
            6101 => Ok(ErrorCode::CategoryNotFound),
            6103 => Ok(ErrorCode::CategorySlugExists),
            6104 => Ok(ErrorCode::CategoryInvalidOperation),
            6105 => Ok(ErrorCode::CategoryConsistencyFault),
            6106 => Ok(ErrorCode::CategoryHasChildren),
            6107 => Ok(ErrorCode::CategoryNotParentable),
            9002 => Ok(ErrorCode::DatabaseError),
            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
