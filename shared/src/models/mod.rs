//! Data models
//!
//! Shared between the category engine and route handlers (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64`.

pub mod category;

// Re-exports
pub use category::*;
