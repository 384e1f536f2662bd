//! Read-only queries
//!
//! Every query returns a finite, fully materialized list and may be retried
//! freely.

use super::CategoryTree;
use crate::db::{CategoryFilter, CategorySort};
use crate::error::{TreeError, TreeResult};
use shared::models::{Category, CategoryNode};
use std::collections::{HashMap, HashSet};

impl CategoryTree {
    pub async fn get(&self, id: i64) -> TreeResult<Category> {
        self.load(id).await
    }

    pub async fn get_by_slug(&self, slug: &str) -> TreeResult<Category> {
        self.store
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| TreeError::NotFound(format!("Category with slug '{slug}'")))
    }

    /// Direct children, ordered by name
    pub async fn get_children(&self, id: i64) -> TreeResult<Vec<Category>> {
        self.load(id).await?;
        let children = self
            .store
            .find_where(CategoryFilter::Parent(Some(id)), CategorySort::PathThenName)
            .await?;
        Ok(children)
    }

    /// Root categories, ordered by name
    pub async fn get_roots(&self) -> TreeResult<Vec<Category>> {
        let roots = self
            .store
            .find_where(CategoryFilter::Parent(None), CategorySort::PathThenName)
            .await?;
        Ok(roots)
    }

    /// Every category below `id`, in tree order
    pub async fn get_descendants(&self, id: i64) -> TreeResult<Vec<Category>> {
        self.load(id).await?;
        let mut descendants = self
            .store
            .find_where(CategoryFilter::PathContains(id), CategorySort::PathThenName)
            .await?;
        descendants.retain(|c| c.id != id);
        tracing::debug!(category_id = id, count = descendants.len(), "Loaded descendants");
        Ok(descendants)
    }

    /// Ancestors from the root down to the direct parent
    ///
    /// Ids in `path` that no longer resolve are skipped.
    pub async fn get_ancestors(&self, id: i64) -> TreeResult<Vec<Category>> {
        let category = self.load(id).await?;
        self.ancestors_of(&category).await
    }

    /// Ancestors followed by the category itself
    pub async fn get_breadcrumbs(&self, id: i64) -> TreeResult<Vec<Category>> {
        let category = self.load(id).await?;
        let mut crumbs = self.ancestors_of(&category).await?;
        crumbs.push(category);
        Ok(crumbs)
    }

    /// Every category in tree order
    pub async fn get_tree(&self) -> TreeResult<Vec<Category>> {
        let all = self
            .store
            .find_where(CategoryFilter::All, CategorySort::PathThenName)
            .await?;
        tracing::debug!(count = all.len(), "Loaded category tree");
        Ok(all)
    }

    pub async fn get_nested_tree(&self) -> TreeResult<Vec<CategoryNode>> {
        Ok(build_nested(self.get_tree().await?))
    }

    async fn ancestors_of(&self, category: &Category) -> TreeResult<Vec<Category>> {
        let ids: Vec<i64> = category
            .path
            .iter()
            .copied()
            .filter(|&p| p != category.id)
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let found = self
            .store
            .find_where(CategoryFilter::Ids(ids.clone()), CategorySort::Unordered)
            .await?;
        let mut by_id: HashMap<i64, Category> = found.into_iter().map(|c| (c.id, c)).collect();
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }
}

/// Group a flat listing into nested nodes on `parent`
///
/// Categories whose parent is not in `categories` become top-level nodes.
/// Sibling order follows the input order. Categories reachable only through
/// a parent cycle are left out.
pub fn build_nested(categories: Vec<Category>) -> Vec<CategoryNode> {
    let ids: HashSet<i64> = categories.iter().map(|c| c.id).collect();
    let mut top = Vec::new();
    let mut by_parent: HashMap<i64, Vec<Category>> = HashMap::new();
    for category in categories {
        match category.parent {
            Some(parent) if parent != category.id && ids.contains(&parent) => {
                by_parent.entry(parent).or_default().push(category)
            }
            _ => top.push(category),
        }
    }

    top.into_iter()
        .map(|category| nest(category, &mut by_parent))
        .collect()
}

fn nest(category: Category, by_parent: &mut HashMap<i64, Vec<Category>>) -> CategoryNode {
    let subcategories = by_parent
        .remove(&category.id)
        .unwrap_or_default()
        .into_iter()
        .map(|child| nest(child, by_parent))
        .collect();
    CategoryNode {
        category,
        subcategories,
    }
}
