//! In-memory category store
//!
//! Backs unit tests and embedded use. Records live behind a
//! `parking_lot::RwLock`; ids come from a monotonically increasing counter.
//! Write failures can be injected to exercise partial multi-write
//! operations and the repair pass.

use super::{
    CategoryFilter, CategorySort, CategoryStore, RepoError, RepoResult, sort_categories,
};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared::models::Category;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

#[derive(Debug, Default)]
pub struct MemoryCategoryStore {
    records: RwLock<HashMap<i64, Category>>,
    next_id: AtomicI64,
    /// Remaining successful saves before every further save fails
    save_budget: Mutex<Option<usize>>,
}

impl MemoryCategoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let the next `n` saves succeed, then fail every save after that
    pub fn fail_saves_after(&self, n: usize) {
        *self.save_budget.lock() = Some(n);
    }

    pub fn clear_faults(&self) {
        *self.save_budget.lock() = None;
    }

    /// Write a record as-is, bypassing fault injection
    ///
    /// Used to seed deliberately inconsistent trees.
    pub fn insert_raw(&self, category: Category) {
        self.next_id.fetch_max(category.id, Ordering::SeqCst);
        self.records.write().insert(category.id, category);
    }

    /// All records ordered by id
    pub fn snapshot(&self) -> Vec<Category> {
        let mut all: Vec<Category> = self.records.read().values().cloned().collect();
        all.sort_by_key(|c| c.id);
        all
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn consume_save_budget(&self) -> RepoResult<()> {
        let mut budget = self.save_budget.lock();
        match budget.as_mut() {
            Some(0) => Err(RepoError::Database("store unavailable".into())),
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CategoryStore for MemoryCategoryStore {
    async fn allocate_id(&self) -> RepoResult<i64> {
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Category>> {
        Ok(self.records.read().get(&id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> RepoResult<Option<Category>> {
        let records = self.records.read();
        let mut matches: Vec<&Category> = records.values().filter(|c| c.slug == slug).collect();
        matches.sort_by_key(|c| c.id);
        Ok(matches.first().map(|c| (*c).clone()))
    }

    async fn find_where(
        &self,
        filter: CategoryFilter,
        sort: CategorySort,
    ) -> RepoResult<Vec<Category>> {
        let mut found: Vec<Category> = self
            .records
            .read()
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        if sort == CategorySort::Unordered {
            found.sort_by_key(|c| c.id);
        } else {
            sort_categories(&mut found, sort);
        }
        Ok(found)
    }

    async fn insert(&self, category: Category) -> RepoResult<Category> {
        self.consume_save_budget()?;
        let mut records = self.records.write();
        if records.contains_key(&category.id) {
            return Err(RepoError::DuplicateId(category.id));
        }
        self.next_id.fetch_max(category.id, Ordering::SeqCst);
        records.insert(category.id, category.clone());
        Ok(category)
    }

    async fn save(&self, category: Category) -> RepoResult<Category> {
        self.consume_save_budget()?;
        self.records.write().insert(category.id, category.clone());
        Ok(category)
    }

    async fn delete_by_id(&self, id: i64) -> RepoResult<bool> {
        Ok(self.records.write().remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root(id: i64, name: &str) -> Category {
        Category {
            id,
            name: name.to_string(),
            slug: name.to_lowercase(),
            description: None,
            parent: None,
            children: vec![],
            level: 0,
            path: vec![id],
            is_leaf: true,
            can_be_parent: true,
            is_active: true,
            is_featured: false,
            sort_order: 0,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[tokio::test]
    async fn test_allocate_id_is_monotonic() {
        let store = MemoryCategoryStore::new();
        let a = store.allocate_id().await.unwrap();
        let b = store.allocate_id().await.unwrap();
        assert!(b > a);
    }

    #[tokio::test]
    async fn test_insert_raw_advances_id_counter() {
        let store = MemoryCategoryStore::new();
        store.insert_raw(root(40, "Garden"));
        assert_eq!(store.allocate_id().await.unwrap(), 41);
    }

    #[tokio::test]
    async fn test_save_find_delete() {
        let store = MemoryCategoryStore::new();
        store.save(root(1, "Electronics")).await.unwrap();

        let found = store.find_by_id(1).await.unwrap().unwrap();
        assert_eq!(found.name, "Electronics");
        assert!(store.find_by_slug("electronics").await.unwrap().is_some());
        assert!(store.find_by_slug("garden").await.unwrap().is_none());

        assert!(store.delete_by_id(1).await.unwrap());
        assert!(!store.delete_by_id(1).await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_insert_never_replaces() {
        let store = MemoryCategoryStore::new();
        store.insert(root(7, "Electronics")).await.unwrap();

        let err = store.insert(root(7, "Garden")).await.unwrap_err();
        assert!(matches!(err, RepoError::DuplicateId(7)));
        assert_eq!(store.find_by_id(7).await.unwrap().unwrap().name, "Electronics");
        assert_eq!(store.len(), 1);
        assert_eq!(store.allocate_id().await.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let store = MemoryCategoryStore::new();
        store.fail_saves_after(1);
        store.save(root(1, "Electronics")).await.unwrap();
        let err = store.save(root(2, "Garden")).await.unwrap_err();
        assert!(matches!(err, RepoError::Database(_)));
        assert_eq!(store.len(), 1);

        store.clear_faults();
        store.save(root(2, "Garden")).await.unwrap();
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_find_where_filters_roots() {
        let store = MemoryCategoryStore::new();
        store.save(root(2, "Garden")).await.unwrap();
        store.save(root(1, "Electronics")).await.unwrap();

        let roots = store
            .find_where(CategoryFilter::Parent(None), CategorySort::PathThenName)
            .await
            .unwrap();
        let names: Vec<_> = roots.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Electronics", "Garden"]);
    }
}
