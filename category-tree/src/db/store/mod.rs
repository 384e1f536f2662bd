//! Category Store
//!
//! Persistence seam of the category tree. The engine only talks to the
//! [`CategoryStore`] trait; every write is a single-document operation and
//! no call spans more than one category atomically.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryCategoryStore;
pub use sqlite::SqliteCategoryStore;

use async_trait::async_trait;
use shared::models::Category;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Store error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Duplicate: {0}")]
    Duplicate(String),

    /// `insert` found a record already stored under this id
    #[error("Category id {0} is already taken")]
    DuplicateId(i64),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return RepoError::Duplicate(db_err.message().to_string());
        }
        RepoError::Database(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for RepoError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        RepoError::Database(format!("Migration failed: {err}"))
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(err: serde_json::Error) -> Self {
        RepoError::Serialization(err.to_string())
    }
}

/// Result type for store operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Which categories a scan returns
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryFilter {
    /// Every category in the collection
    All,
    /// Categories with one of the given ids (missing ids are skipped)
    Ids(Vec<i64>),
    /// Categories whose `path` contains the id (the category itself included)
    PathContains(i64),
    /// Categories with the given `parent`; `None` selects roots
    Parent(Option<i64>),
}

impl CategoryFilter {
    /// Evaluate the filter against a single record
    pub fn matches(&self, category: &Category) -> bool {
        match self {
            Self::All => true,
            Self::Ids(ids) => ids.contains(&category.id),
            Self::PathContains(id) => category.path.contains(id),
            Self::Parent(parent) => category.parent == *parent,
        }
    }
}

/// Ordering applied to scan results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CategorySort {
    #[default]
    Unordered,
    /// Tree order: ancestors before their descendants, siblings by name
    PathThenName,
    /// Shallowest first, then by name
    LevelAsc,
}

/// Persistent collection of category records
///
/// Implementations own all persisted state. `insert` only ever adds a record;
/// `save` is an insert-or-replace of the whole record.
#[async_trait]
pub trait CategoryStore: Send + Sync {
    /// Reserve a fresh, never-used category id
    async fn allocate_id(&self) -> RepoResult<i64>;

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Category>>;

    async fn find_by_slug(&self, slug: &str) -> RepoResult<Option<Category>>;

    async fn find_where(
        &self,
        filter: CategoryFilter,
        sort: CategorySort,
    ) -> RepoResult<Vec<Category>>;

    /// Add a new record, failing with [`RepoError::DuplicateId`] when the id
    /// is already stored. Never modifies an existing record.
    async fn insert(&self, category: Category) -> RepoResult<Category>;

    async fn save(&self, category: Category) -> RepoResult<Category>;

    /// Returns whether a record was removed
    async fn delete_by_id(&self, id: i64) -> RepoResult<bool>;
}

/// Order a scan result in place
pub fn sort_categories(categories: &mut Vec<Category>, sort: CategorySort) {
    match sort {
        CategorySort::Unordered => {}
        CategorySort::LevelAsc => categories.sort_by(|a, b| {
            a.level
                .cmp(&b.level)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        }),
        CategorySort::PathThenName => {
            let taken = std::mem::take(categories);
            *categories = tree_order(taken);
        }
    }
}

/// Pre-order walk of the parent links inside `categories`
///
/// Nodes whose parent is outside the set act as roots. Nodes only reachable
/// through a parent cycle are appended at the end, ordered by path.
fn tree_order(categories: Vec<Category>) -> Vec<Category> {
    let ids: HashSet<i64> = categories.iter().map(|c| c.id).collect();
    let mut roots = Vec::new();
    let mut by_parent: HashMap<i64, Vec<Category>> = HashMap::new();

    for category in categories {
        match category.parent {
            Some(parent) if parent != category.id && ids.contains(&parent) => {
                by_parent.entry(parent).or_default().push(category)
            }
            _ => roots.push(category),
        }
    }

    let by_name = |a: &Category, b: &Category| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id));
    roots.sort_by(by_name);
    for siblings in by_parent.values_mut() {
        siblings.sort_by(by_name);
    }

    let mut ordered = Vec::with_capacity(ids.len());
    let mut stack: Vec<Category> = roots.into_iter().rev().collect();
    while let Some(category) = stack.pop() {
        if let Some(children) = by_parent.remove(&category.id) {
            stack.extend(children.into_iter().rev());
        }
        ordered.push(category);
    }

    let mut unreachable: Vec<Category> = by_parent.into_values().flatten().collect();
    unreachable.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.name.cmp(&b.name)));
    ordered.extend(unreachable);
    ordered
}
