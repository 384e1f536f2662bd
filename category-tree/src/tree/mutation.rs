//! Structural mutations: create, update, re-parent, delete
//!
//! Every rule check happens before the first write. Writes after the first
//! are not rolled back when they fail; the error is returned and the
//! remaining inconsistency is left for the repair pass.

use super::slug::unique_slug;
use super::{CategoryTree, DeletePolicy, ensure_can_be_parent, placement};
use crate::db::{CategoryFilter, CategorySort, RepoError};
use crate::error::{TreeError, TreeResult};
use crate::utils::validation::{validate_description, validate_name};
use shared::error::ErrorCode;
use shared::models::{Category, CategoryCreate, CategoryUpdate};
use shared::util::now_millis;
use std::collections::{HashMap, HashSet, VecDeque};

/// Allocations tried before a create gives up on id collisions
const MAX_ID_ATTEMPTS: usize = 5;

impl CategoryTree {
    /// Create a category, as a root or under `data.parent`
    pub async fn create(&self, data: CategoryCreate) -> TreeResult<Category> {
        let name = validate_name(&data.name)?;
        let description = validate_description(data.description.as_deref())?;

        let parent = match data.parent {
            Some(parent_id) => {
                let parent = self.load(parent_id).await?;
                ensure_can_be_parent(&parent)?;
                Some(parent)
            }
            None => None,
        };

        let mut attempt = 0;
        let category = loop {
            attempt += 1;
            let id = self.store.allocate_id().await?;
            let slug = unique_slug(self.store.as_ref(), &name, id).await?;
            let (level, path) = placement(parent.as_ref(), id);
            let now = now_millis();

            let inserted = self
                .store
                .insert(Category {
                    id,
                    name: name.clone(),
                    slug,
                    description: description.clone(),
                    parent: parent.as_ref().map(|p| p.id),
                    children: Vec::new(),
                    level,
                    path,
                    is_leaf: true,
                    can_be_parent: data.can_be_parent.unwrap_or(true),
                    is_active: data.is_active.unwrap_or(true),
                    is_featured: data.is_featured.unwrap_or(false),
                    sort_order: data.sort_order.unwrap_or(0),
                    created_at: now,
                    updated_at: now,
                })
                .await;
            match inserted {
                Ok(category) => break category,
                Err(RepoError::DuplicateId(taken)) if attempt < MAX_ID_ATTEMPTS => {
                    tracing::warn!(
                        category_id = taken,
                        attempt,
                        "Allocated id already taken, retrying"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        };
        let id = category.id;

        if let Some(parent) = &parent {
            self.attach_child(parent.id, id).await?;
        }

        tracing::info!(
            category_id = id,
            parent = ?category.parent,
            slug = %category.slug,
            "Category created"
        );
        Ok(category)
    }

    /// Update descriptive fields; structure is never touched here
    pub async fn update(&self, id: i64, data: CategoryUpdate) -> TreeResult<Category> {
        let mut category = self.load(id).await?;

        if let Some(name) = data.name.as_deref() {
            let name = validate_name(name)?;
            if name != category.name {
                category.slug = unique_slug(self.store.as_ref(), &name, id).await?;
                category.name = name;
            }
        }
        if let Some(description) = data.description.as_deref() {
            category.description = validate_description(Some(description))?;
        }
        if let Some(can_be_parent) = data.can_be_parent {
            category.can_be_parent = can_be_parent;
        }
        if let Some(is_active) = data.is_active {
            category.is_active = is_active;
        }
        if let Some(is_featured) = data.is_featured {
            category.is_featured = is_featured;
        }
        if let Some(sort_order) = data.sort_order {
            category.sort_order = sort_order;
        }
        category.updated_at = now_millis();

        let category = self.store.save(category).await?;
        tracing::info!(category_id = id, slug = %category.slug, "Category updated");
        Ok(category)
    }

    /// Move a category (and its subtree) under `new_parent`, or make it a root
    ///
    /// Write order: old parent, new parent, descendants, the node itself.
    pub async fn reparent(&self, id: i64, new_parent: Option<i64>) -> TreeResult<Category> {
        let category = self.load(id).await?;
        let target = match new_parent {
            Some(parent_id) if parent_id == id => {
                return Err(TreeError::invalid(format!(
                    "Category {id} cannot be its own parent"
                )));
            }
            Some(parent_id) => Some(self.load(parent_id).await?),
            None => None,
        };
        if category.parent == new_parent {
            return Ok(category);
        }

        if let Some(parent) = &target {
            if parent.has_in_path(id) {
                return Err(TreeError::invalid(format!(
                    "Category {} is a descendant of category {id}",
                    parent.id
                )));
            }
            ensure_can_be_parent(parent)?;
        }

        let old_parent = category.parent;
        if let Some(old_parent) = old_parent {
            self.detach_child(old_parent, id).await?;
        }
        if let Some(parent) = &target {
            self.attach_child(parent.id, id).await?;
        }

        let (level, path) = placement(target.as_ref(), id);
        let moved = self.move_descendants(&category, &path).await?;

        let mut category = category;
        category.parent = target.as_ref().map(|p| p.id);
        category.level = level;
        category.path = path;
        category.updated_at = now_millis();
        let category = self.store.save(category).await?;

        tracing::info!(
            category_id = id,
            from = ?old_parent,
            to = ?category.parent,
            descendants = moved,
            "Category re-parented"
        );
        Ok(category)
    }

    /// Delete a category, handling its children per the configured policy
    ///
    /// Returns the number of categories removed.
    pub async fn delete(&self, id: i64) -> TreeResult<usize> {
        let category = self.load(id).await?;
        let children = self
            .store
            .find_where(CategoryFilter::Parent(Some(id)), CategorySort::Unordered)
            .await?;

        let mut removed = 0;
        match self.options.delete_policy {
            DeletePolicy::Reject => {
                if !children.is_empty() {
                    return Err(TreeError::InvalidOperation(
                        ErrorCode::CategoryHasChildren,
                        format!(
                            "Category {id} has {} child categories",
                            children.len()
                        ),
                    ));
                }
            }
            DeletePolicy::ReassignToParent => {
                let grandparent = match category.parent {
                    Some(parent_id) if !children.is_empty() => {
                        self.store.find_by_id(parent_id).await?
                    }
                    _ => None,
                };
                if let Some(grandparent) = &grandparent {
                    ensure_can_be_parent(grandparent)?;
                }
                let target = grandparent.map(|g| g.id);
                for child in &children {
                    self.reparent(child.id, target).await?;
                }
            }
            DeletePolicy::Cascade => {
                for descendant in self.subtree_deepest_first(id).await? {
                    if self.store.delete_by_id(descendant).await? {
                        removed += 1;
                    }
                }
            }
        }

        if self.store.delete_by_id(id).await? {
            removed += 1;
        }
        if let Some(parent) = category.parent {
            self.detach_child(parent, id).await?;
        }

        tracing::info!(
            category_id = id,
            policy = %self.options.delete_policy,
            removed,
            "Category deleted"
        );
        Ok(removed)
    }

    /// Recompute `level`/`path` for everything below `category`
    ///
    /// Placement follows each descendant's `parent` link; when that parent is
    /// not part of the moved subtree the stored path suffix below `category`
    /// is kept.
    async fn move_descendants(&self, category: &Category, new_path: &[i64]) -> TreeResult<usize> {
        let descendants = self
            .store
            .find_where(CategoryFilter::PathContains(category.id), CategorySort::LevelAsc)
            .await?;

        let mut placed: HashMap<i64, Vec<i64>> = HashMap::new();
        placed.insert(category.id, new_path.to_vec());

        let mut moved = 0;
        for mut descendant in descendants {
            if descendant.id == category.id {
                continue;
            }
            let path = match descendant.parent.and_then(|p| placed.get(&p)) {
                Some(parent_path) => {
                    let mut path = parent_path.clone();
                    path.push(descendant.id);
                    path
                }
                None => {
                    let below = descendant
                        .path
                        .iter()
                        .position(|&p| p == category.id)
                        .map(|pos| descendant.path[pos + 1..].to_vec())
                        .unwrap_or_else(|| vec![descendant.id]);
                    let mut path = new_path.to_vec();
                    path.extend(below);
                    path
                }
            };
            placed.insert(descendant.id, path.clone());

            let level = path.len() as i32 - 1;
            if descendant.path != path || descendant.level != level {
                descendant.path = path;
                descendant.level = level;
                descendant.updated_at = now_millis();
                self.store.save(descendant).await?;
                moved += 1;
            }
        }
        Ok(moved)
    }

    /// Ids below `id` following `parent` links, deepest first
    async fn subtree_deepest_first(&self, id: i64) -> TreeResult<Vec<i64>> {
        let mut seen = HashSet::from([id]);
        let mut order = Vec::new();
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            let children = self
                .store
                .find_where(CategoryFilter::Parent(Some(current)), CategorySort::Unordered)
                .await?;
            for child in children {
                if seen.insert(child.id) {
                    order.push(child.id);
                    queue.push_back(child.id);
                }
            }
        }
        order.reverse();
        Ok(order)
    }

    /// Add `child` to the parent's `children` set
    ///
    /// The parent is re-read so concurrent edits to its other fields survive.
    async fn attach_child(&self, parent_id: i64, child: i64) -> TreeResult<()> {
        let Some(mut parent) = self.store.find_by_id(parent_id).await? else {
            tracing::warn!(parent_id, child, "Parent vanished before attach; repair required");
            return Ok(());
        };
        if parent.children.contains(&child) && !parent.is_leaf {
            return Ok(());
        }
        if !parent.children.contains(&child) {
            parent.children.push(child);
        }
        parent.is_leaf = false;
        parent.updated_at = now_millis();
        self.store.save(parent).await?;
        Ok(())
    }

    /// Remove `child` from the parent's `children` set and recompute `is_leaf`
    async fn detach_child(&self, parent_id: i64, child: i64) -> TreeResult<()> {
        let Some(mut parent) = self.store.find_by_id(parent_id).await? else {
            tracing::warn!(parent_id, child, "Parent missing during detach");
            return Ok(());
        };
        let before = parent.children.len();
        parent.children.retain(|&c| c != child);
        let is_leaf = parent.children.is_empty();
        if parent.children.len() == before && parent.is_leaf == is_leaf {
            return Ok(());
        }
        parent.is_leaf = is_leaf;
        parent.updated_at = now_millis();
        self.store.save(parent).await?;
        Ok(())
    }
}
