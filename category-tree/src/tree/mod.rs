//! Category Tree
//!
//! Service enforcing the hierarchy invariants over records read from a
//! [`CategoryStore`]:
//!
//! 1. `level` is 0 for roots, otherwise `parent.level + 1`
//! 2. `path` is `parent.path ++ [id]`, or `[id]` for roots
//! 3. `children` is exactly the set of categories whose `parent` is this one
//! 4. `is_leaf == children.is_empty()`
//! 5. no category appears in its own ancestry
//! 6. slugs are unique
//! 7. only categories with `can_be_parent` receive new children
//!
//! Multi-node mutations are ordered sequences of single-record writes.
//! A failure part way leaves the tree as far as the last successful write;
//! [`CategoryTree::repair`] restores the invariants from the `parent`
//! references.

mod mutation;
mod query;
pub mod repair;
pub mod slug;

pub use query::build_nested;
pub use repair::{ConsistencyFault, RepairReport};

use crate::db::CategoryStore;
use crate::error::{TreeError, TreeResult};
use shared::error::ErrorCode;
use shared::models::Category;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// What happens to the children of a deleted category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeletePolicy {
    /// Refuse to delete a category that still has children
    #[default]
    Reject,
    /// Move the children under the deleted category's parent (or make them roots)
    ReassignToParent,
    /// Delete the whole subtree
    Cascade,
}

impl FromStr for DeletePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "reassign" | "reassign_to_parent" => Ok(Self::ReassignToParent),
            "cascade" => Ok(Self::Cascade),
            other => Err(format!(
                "unknown delete policy '{other}' (expected reject | reassign | cascade)"
            )),
        }
    }
}

impl fmt::Display for DeletePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Reject => "reject",
            Self::ReassignToParent => "reassign",
            Self::Cascade => "cascade",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TreeOptions {
    pub delete_policy: DeletePolicy,
}

/// Hierarchy engine over a category store
///
/// Holds no state between calls besides the store handle.
#[derive(Clone)]
pub struct CategoryTree {
    store: Arc<dyn CategoryStore>,
    options: TreeOptions,
}

impl fmt::Debug for CategoryTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CategoryTree")
            .field("options", &self.options)
            .finish()
    }
}

impl CategoryTree {
    pub fn new(store: Arc<dyn CategoryStore>, options: TreeOptions) -> Self {
        Self { store, options }
    }

    pub fn store(&self) -> &Arc<dyn CategoryStore> {
        &self.store
    }

    pub fn options(&self) -> TreeOptions {
        self.options
    }

    async fn load(&self, id: i64) -> TreeResult<Category> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| TreeError::category_not_found(id))
    }
}

/// `level` and `path` of category `id` placed under `parent`
fn placement(parent: Option<&Category>, id: i64) -> (i32, Vec<i64>) {
    match parent {
        Some(parent) => {
            let mut path = parent.path.clone();
            path.push(id);
            (parent.level + 1, path)
        }
        None => (0, vec![id]),
    }
}

fn ensure_can_be_parent(parent: &Category) -> TreeResult<()> {
    if parent.can_be_parent {
        Ok(())
    } else {
        Err(TreeError::InvalidOperation(
            ErrorCode::CategoryNotParentable,
            format!("Category {} cannot have child categories", parent.id),
        ))
    }
}
