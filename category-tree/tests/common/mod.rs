//! Helpers shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use category_tree::db::{CategoryFilter, CategorySort, RepoResult};
use category_tree::{CategoryStore, CategoryTree, DeletePolicy, MemoryCategoryStore, TreeOptions};
use parking_lot::Mutex;
use shared::models::Category;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;

pub fn memory_tree(policy: DeletePolicy) -> (Arc<MemoryCategoryStore>, CategoryTree) {
    let store = Arc::new(MemoryCategoryStore::new());
    let tree = CategoryTree::new(
        store.clone(),
        TreeOptions {
            delete_policy: policy,
        },
    );
    (store, tree)
}

/// Store wrapper whose `allocate_id` hands out queued ids first
///
/// Lets a test force the allocator onto an id that is already taken.
pub struct ScriptedIds {
    inner: Arc<dyn CategoryStore>,
    queued: Mutex<VecDeque<i64>>,
}

impl ScriptedIds {
    pub fn new(inner: Arc<dyn CategoryStore>, ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            inner,
            queued: Mutex::new(ids.into_iter().collect()),
        }
    }
}

#[async_trait]
impl CategoryStore for ScriptedIds {
    async fn allocate_id(&self) -> RepoResult<i64> {
        let next = self.queued.lock().pop_front();
        match next {
            Some(id) => Ok(id),
            None => self.inner.allocate_id().await,
        }
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Category>> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_slug(&self, slug: &str) -> RepoResult<Option<Category>> {
        self.inner.find_by_slug(slug).await
    }

    async fn find_where(
        &self,
        filter: CategoryFilter,
        sort: CategorySort,
    ) -> RepoResult<Vec<Category>> {
        self.inner.find_where(filter, sort).await
    }

    async fn insert(&self, category: Category) -> RepoResult<Category> {
        self.inner.insert(category).await
    }

    async fn save(&self, category: Category) -> RepoResult<Category> {
        self.inner.save(category).await
    }

    async fn delete_by_id(&self, id: i64) -> RepoResult<bool> {
        self.inner.delete_by_id(id).await
    }
}

pub fn by_id(categories: &[Category]) -> HashMap<i64, &Category> {
    categories.iter().map(|c| (c.id, c)).collect()
}

pub fn names(categories: &[Category]) -> Vec<&str> {
    categories.iter().map(|c| c.name.as_str()).collect()
}

/// Panic with a description of the first violated hierarchy invariant
pub fn assert_invariants(categories: &[Category]) {
    let index = by_id(categories);
    let mut slugs = HashSet::new();

    for c in categories {
        match c.parent {
            None => {
                assert_eq!(c.level, 0, "root {} has level {}", c.id, c.level);
                assert_eq!(c.path, vec![c.id], "root {} has path {:?}", c.id, c.path);
            }
            Some(parent_id) => {
                let parent = index
                    .get(&parent_id)
                    .unwrap_or_else(|| panic!("{} has dangling parent {parent_id}", c.id));
                assert_eq!(c.level, parent.level + 1, "level of {}", c.id);
                let mut expected = parent.path.clone();
                expected.push(c.id);
                assert_eq!(c.path, expected, "path of {}", c.id);
            }
        }

        let inverse: BTreeSet<i64> = categories
            .iter()
            .filter(|other| other.parent == Some(c.id))
            .map(|other| other.id)
            .collect();
        let listed: BTreeSet<i64> = c.children.iter().copied().collect();
        assert_eq!(listed.len(), c.children.len(), "duplicate children in {}", c.id);
        assert_eq!(listed, inverse, "children of {}", c.id);
        assert_eq!(c.is_leaf, c.children.is_empty(), "is_leaf of {}", c.id);

        let occurrences = c.path.iter().filter(|&&p| p == c.id).count();
        assert_eq!(occurrences, 1, "{} appears in its own ancestry", c.id);

        assert!(slugs.insert(c.slug.clone()), "slug '{}' is not unique", c.slug);
    }
}
