//! Category Model

use serde::{Deserialize, Serialize};

/// Category entity: one node of the catalog hierarchy
///
/// `children`, `level`, `path` and `is_leaf` are denormalized from the
/// `parent` references and are only written by the category tree engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Category {
    pub id: i64,
    pub name: String,
    /// URL-safe, globally unique identifier derived from `name`
    pub slug: String,
    pub description: Option<String>,
    /// Parent category id, `None` for roots
    pub parent: Option<i64>,
    /// Ids of categories whose `parent` is this category
    #[cfg_attr(feature = "db", sqlx(json))]
    #[serde(default)]
    pub children: Vec<i64>,
    /// 0 for roots, otherwise `parent.level + 1`
    pub level: i32,
    /// Ancestor ids from the root down to and including this category
    #[cfg_attr(feature = "db", sqlx(json))]
    #[serde(default)]
    pub path: Vec<i64>,
    #[serde(default = "default_true")]
    pub is_leaf: bool,
    /// Whether this category may receive child categories
    #[serde(default = "default_true")]
    pub can_be_parent: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

fn default_true() -> bool {
    true
}

impl Category {
    /// Whether this category is a root (has no parent)
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Whether `id` is this category or one of its ancestors
    pub fn has_in_path(&self, id: i64) -> bool {
        self.path.contains(&id)
    }
}

/// Create category payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryCreate {
    pub name: String,
    pub description: Option<String>,
    pub parent: Option<i64>,
    pub can_be_parent: Option<bool>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
    pub sort_order: Option<i32>,
}

impl CategoryCreate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn under(name: impl Into<String>, parent: i64) -> Self {
        Self {
            name: name.into(),
            parent: Some(parent),
            ..Default::default()
        }
    }
}

/// Update category payload
///
/// Hierarchy fields are deliberately absent: moving a category goes through
/// the re-parent operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub can_be_parent: Option<bool>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
    pub sort_order: Option<i32>,
}

/// Nested rendering of the tree, built by grouping a flat listing on `parent`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: Category,
    #[serde(default)]
    pub subcategories: Vec<CategoryNode>,
}
