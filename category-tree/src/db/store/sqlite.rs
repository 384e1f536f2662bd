//! SQLite category store
//!
//! `children` and `path` are stored as JSON text columns and decoded through
//! `#[sqlx(json)]` on the shared model. Path containment uses `json_each`.

use super::{
    CategoryFilter, CategorySort, CategoryStore, RepoError, RepoResult, sort_categories,
};
use async_trait::async_trait;
use shared::models::Category;
use sqlx::SqlitePool;

const CATEGORY_SELECT: &str = "SELECT id, name, slug, description, parent, children, level, path, is_leaf, can_be_parent, is_active, is_featured, sort_order, created_at, updated_at FROM category";

const CATEGORY_INSERT: &str = "INSERT INTO category (id, name, slug, description, parent, children, level, path, is_leaf, can_be_parent, is_active, is_featured, sort_order, created_at, updated_at) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)";

const CATEGORY_UPSERT_TAIL: &str = "ON CONFLICT(id) DO UPDATE SET name = excluded.name, slug = excluded.slug, description = excluded.description, parent = excluded.parent, children = excluded.children, level = excluded.level, path = excluded.path, is_leaf = excluded.is_leaf, can_be_parent = excluded.can_be_parent, is_active = excluded.is_active, is_featured = excluded.is_featured, sort_order = excluded.sort_order, created_at = excluded.created_at, updated_at = excluded.updated_at";

#[derive(Debug, Clone)]
pub struct SqliteCategoryStore {
    pool: SqlitePool,
}

impl SqliteCategoryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn write(&self, sql: &str, category: &Category) -> RepoResult<()> {
        let children_json = serde_json::to_string(&category.children)?;
        let path_json = serde_json::to_string(&category.path)?;
        sqlx::query(sql)
            .bind(category.id)
            .bind(&category.name)
            .bind(&category.slug)
            .bind(&category.description)
            .bind(category.parent)
            .bind(&children_json)
            .bind(category.level)
            .bind(&path_json)
            .bind(category.is_leaf)
            .bind(category.can_be_parent)
            .bind(category.is_active)
            .bind(category.is_featured)
            .bind(category.sort_order)
            .bind(category.created_at)
            .bind(category.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error(e, category.id))?;
        Ok(())
    }
}

/// Primary key collisions become `DuplicateId`; the slug index keeps `Duplicate`
fn write_error(err: sqlx::Error, id: i64) -> RepoError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
        && db_err.message().contains("category.id")
    {
        return RepoError::DuplicateId(id);
    }
    RepoError::from(err)
}

#[async_trait]
impl CategoryStore for SqliteCategoryStore {
    async fn allocate_id(&self) -> RepoResult<i64> {
        Ok(shared::util::snowflake_id())
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Category>> {
        let sql = format!("{CATEGORY_SELECT} WHERE id = ?");
        let category = sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(category)
    }

    async fn find_by_slug(&self, slug: &str) -> RepoResult<Option<Category>> {
        let sql = format!("{CATEGORY_SELECT} WHERE slug = ? LIMIT 1");
        let category = sqlx::query_as::<_, Category>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(category)
    }

    async fn find_where(
        &self,
        filter: CategoryFilter,
        sort: CategorySort,
    ) -> RepoResult<Vec<Category>> {
        let mut categories = match filter {
            CategoryFilter::All => {
                let sql = format!("{CATEGORY_SELECT} ORDER BY id");
                sqlx::query_as::<_, Category>(&sql)
                    .fetch_all(&self.pool)
                    .await?
            }
            CategoryFilter::Ids(ids) => {
                if ids.is_empty() {
                    return Ok(Vec::new());
                }
                let placeholders = vec!["?"; ids.len()].join(", ");
                let sql = format!("{CATEGORY_SELECT} WHERE id IN ({placeholders}) ORDER BY id");
                let mut query = sqlx::query_as::<_, Category>(&sql);
                for id in ids {
                    query = query.bind(id);
                }
                query.fetch_all(&self.pool).await?
            }
            CategoryFilter::PathContains(id) => {
                let sql = format!(
                    "{CATEGORY_SELECT} WHERE EXISTS (SELECT 1 FROM json_each(category.path) WHERE json_each.value = ?) ORDER BY id"
                );
                sqlx::query_as::<_, Category>(&sql)
                    .bind(id)
                    .fetch_all(&self.pool)
                    .await?
            }
            CategoryFilter::Parent(Some(parent)) => {
                let sql = format!("{CATEGORY_SELECT} WHERE parent = ? ORDER BY id");
                sqlx::query_as::<_, Category>(&sql)
                    .bind(parent)
                    .fetch_all(&self.pool)
                    .await?
            }
            CategoryFilter::Parent(None) => {
                let sql = format!("{CATEGORY_SELECT} WHERE parent IS NULL ORDER BY id");
                sqlx::query_as::<_, Category>(&sql)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        sort_categories(&mut categories, sort);
        Ok(categories)
    }

    async fn insert(&self, category: Category) -> RepoResult<Category> {
        self.write(CATEGORY_INSERT, &category).await?;
        Ok(category)
    }

    async fn save(&self, category: Category) -> RepoResult<Category> {
        let sql = format!("{CATEGORY_INSERT} {CATEGORY_UPSERT_TAIL}");
        self.write(&sql, &category).await?;
        Ok(category)
    }

    async fn delete_by_id(&self, id: i64) -> RepoResult<bool> {
        let rows = sqlx::query("DELETE FROM category WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(rows.rows_affected() > 0)
    }
}
