//! Category hierarchy engine
//!
//! Keeps a tree of catalog categories consistent under create, rename,
//! re-parent and delete. Each record carries denormalized ancestry (`path`),
//! a computed `level`, the inverse `children` set and an `is_leaf` flag.
//!
//! # Module layout
//!
//! ```text
//! category-tree/src/
//! ├── core/     # configuration
//! ├── db/       # connection pool, CategoryStore trait, memory + SQLite stores
//! ├── tree/     # CategoryTree service: mutations, queries, slug, repair
//! ├── utils/    # logger, field validation
//! └── error.rs  # TreeError
//! ```

pub mod core;
pub mod db;
pub mod error;
pub mod tree;
pub mod utils;

pub use crate::core::Config;
pub use db::{CategoryStore, DbService, MemoryCategoryStore, SqliteCategoryStore};
pub use error::{TreeError, TreeResult};
pub use tree::{CategoryTree, ConsistencyFault, DeletePolicy, RepairReport, TreeOptions};

pub use utils::logger::{init_logger, init_logger_with_file};
