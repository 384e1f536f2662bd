//! Error codes shared by the category crates
//!
//! - [`ErrorCode`]: stable numeric codes
//! - [`ErrorCategory`]: classification by code range
//! - [`AppError`]: coded error with message and details
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCategory, ErrorCode};
//!
//! let err = AppError::with_message(ErrorCode::ValidationFailed, "Name is too short")
//!     .with_detail("field", "name");
//! assert_eq!(err.code.category(), ErrorCategory::General);
//! assert_eq!(err.http_status().as_u16(), 400);
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::AppError;
