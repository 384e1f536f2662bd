//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::CategoryNotFound => StatusCode::NOT_FOUND,

            Self::CategorySlugExists | Self::CategoryHasChildren => StatusCode::CONFLICT,

            // structural rule violations
            Self::CategoryInvalidOperation | Self::CategoryNotParentable => {
                StatusCode::UNPROCESSABLE_ENTITY
            }

            Self::DatabaseError | Self::CategoryConsistencyFault => {
                StatusCode::INTERNAL_SERVER_ERROR
            }

            Self::ValidationFailed => StatusCode::BAD_REQUEST,
        }
    }
}
