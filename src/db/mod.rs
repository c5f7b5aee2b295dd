pub mod documents;
pub mod pool;
pub mod queries;
pub mod shim;
pub mod tables;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use sqlx::PgPool;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{GalleryItem, UserRecord};

pub use documents::DocumentStore;
pub use pool::{connect_or_fallback, create_pool};
pub use shim::MemorySql;

/// Postgres unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// Relational tier: Postgres when connected, otherwise the in-memory SQL shim
///
/// Both paths issue the same literal statements from [`queries`].
#[derive(Clone)]
pub struct Database {
    pool: Option<PgPool>,
    shim: Arc<MemorySql>,
}

impl Database {
    pub fn new(pool: Option<PgPool>) -> Self {
        Self {
            pool,
            shim: Arc::new(MemorySql::new()),
        }
    }

    /// Database that always answers through the SQL shim
    pub fn in_memory() -> Self {
        Self::new(None)
    }

    pub fn is_connected(&self) -> bool {
        self.pool.is_some()
    }

    /// Name reported by health checks and admin stats
    pub fn backend_name(&self) -> &'static str {
        if self.is_connected() {
            "postgres"
        } else {
            "memory-sql"
        }
    }

    /// Check that the active backend answers queries
    pub async fn ping(&self) -> bool {
        match &self.pool {
            Some(pool) => match sqlx::query("SELECT 1").execute(pool).await {
                Ok(_) => true,
                Err(e) => {
                    tracing::error!("Database health check failed: {:?}", e);
                    false
                }
            },
            None => true,
        }
    }

    async fn shim_rows<T: DeserializeOwned>(&self, sql: &str, params: &[Value]) -> Result<Vec<T>> {
        self.shim
            .query(sql, params)
            .await
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(AppError::from))
            .collect()
    }

    async fn shim_count(&self, sql: &str) -> i64 {
        self.shim
            .query(sql, &[])
            .await
            .first()
            .and_then(|row| row.get("count"))
            .and_then(Value::as_i64)
            .unwrap_or(0)
    }

    // =========================================================================
    // Users
    // =========================================================================

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        match &self.pool {
            Some(pool) => Ok(sqlx::query_as::<_, UserRecord>(queries::SELECT_USER_BY_EMAIL)
                .bind(email)
                .fetch_optional(pool)
                .await?),
            None => Ok(self
                .shim_rows(queries::SELECT_USER_BY_EMAIL, &[json!(email)])
                .await?
                .into_iter()
                .next()),
        }
    }

    pub async fn find_user_by_id(&self, id: &str) -> Result<Option<UserRecord>> {
        match &self.pool {
            Some(pool) => Ok(sqlx::query_as::<_, UserRecord>(queries::SELECT_USER_BY_ID)
                .bind(id)
                .fetch_optional(pool)
                .await?),
            None => Ok(self
                .shim_rows(queries::SELECT_USER_BY_ID, &[json!(id)])
                .await?
                .into_iter()
                .next()),
        }
    }

    /// Insert a user; a taken email (any case) is `UserAlreadyExists`
    pub async fn insert_user(&self, user: &UserRecord) -> Result<UserRecord> {
        match &self.pool {
            Some(pool) => sqlx::query_as::<_, UserRecord>(queries::INSERT_USER)
                .bind(&user.id)
                .bind(&user.email)
                .bind(&user.username)
                .bind(&user.password)
                .bind(user.created_at)
                .fetch_one(pool)
                .await
                .map_err(|e| match &e {
                    sqlx::Error::Database(db_err)
                        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) =>
                    {
                        AppError::UserAlreadyExists
                    }
                    _ => AppError::from(e),
                }),
            None => {
                let params = [
                    json!(user.id),
                    json!(user.email),
                    json!(user.username),
                    json!(user.password),
                    json!(user.created_at),
                ];
                self.shim_rows(queries::INSERT_USER, &params)
                    .await?
                    .into_iter()
                    .next()
                    .ok_or(AppError::UserAlreadyExists)
            }
        }
    }

    pub async fn list_users(&self) -> Result<Vec<UserRecord>> {
        match &self.pool {
            Some(pool) => Ok(sqlx::query_as::<_, UserRecord>(queries::LIST_USERS)
                .fetch_all(pool)
                .await?),
            None => self.shim_rows(queries::LIST_USERS, &[]).await,
        }
    }

    pub async fn count_users(&self) -> Result<i64> {
        match &self.pool {
            Some(pool) => Ok(sqlx::query_scalar::<_, i64>(queries::COUNT_USERS)
                .fetch_one(pool)
                .await?),
            None => Ok(self.shim_count(queries::COUNT_USERS).await),
        }
    }

    /// Returns whether a user was removed
    pub async fn delete_user(&self, id: &str) -> Result<bool> {
        let removed: Vec<UserRecord> = match &self.pool {
            Some(pool) => {
                sqlx::query_as(queries::DELETE_USER_BY_ID)
                    .bind(id)
                    .fetch_all(pool)
                    .await?
            }
            None => self.shim_rows(queries::DELETE_USER_BY_ID, &[json!(id)]).await?,
        };
        Ok(!removed.is_empty())
    }

    pub async fn delete_all_users(&self) -> Result<u64> {
        let removed: Vec<UserRecord> = match &self.pool {
            Some(pool) => sqlx::query_as(queries::DELETE_ALL_USERS).fetch_all(pool).await?,
            None => self.shim_rows(queries::DELETE_ALL_USERS, &[]).await?,
        };
        Ok(removed.len() as u64)
    }

    // =========================================================================
    // Gallery
    // =========================================================================

    /// Insert a metadata row, returning the row as stored
    pub async fn insert_gallery_item(&self, item: &GalleryItem) -> Result<GalleryItem> {
        match &self.pool {
            Some(pool) => Ok(sqlx::query_as::<_, GalleryItem>(queries::INSERT_GALLERY_ITEM)
                .bind(&item.id)
                .bind(&item.title)
                .bind(&item.image_url)
                .bind(item.date_uploaded)
                .bind(item.downloads)
                .bind(&item.author)
                .bind(&item.tags)
                .bind(item.chill_level)
                .bind(&item.user_id)
                .fetch_one(pool)
                .await?),
            None => {
                let params = [
                    json!(item.id),
                    json!(item.title),
                    json!(item.image_url),
                    json!(item.date_uploaded),
                    json!(item.downloads),
                    json!(item.author),
                    json!(item.tags),
                    json!(item.chill_level),
                    json!(item.user_id),
                ];
                self.shim_rows(queries::INSERT_GALLERY_ITEM, &params)
                    .await?
                    .into_iter()
                    .next()
                    .ok_or_else(|| {
                        AppError::StorageUnavailable("Relational insert returned no row".to_string())
                    })
            }
        }
    }

    /// All metadata rows, newest first
    pub async fn list_gallery(&self) -> Result<Vec<GalleryItem>> {
        match &self.pool {
            Some(pool) => Ok(sqlx::query_as::<_, GalleryItem>(queries::LIST_GALLERY)
                .fetch_all(pool)
                .await?),
            None => self.shim_rows(queries::LIST_GALLERY, &[]).await,
        }
    }

    pub async fn get_gallery_item(&self, id: &str) -> Result<Option<GalleryItem>> {
        match &self.pool {
            Some(pool) => Ok(sqlx::query_as::<_, GalleryItem>(queries::SELECT_GALLERY_BY_ID)
                .bind(id)
                .fetch_optional(pool)
                .await?),
            None => Ok(self
                .shim_rows(queries::SELECT_GALLERY_BY_ID, &[json!(id)])
                .await?
                .into_iter()
                .next()),
        }
    }

    /// Bump the download counter, returning the updated row if the id exists
    pub async fn increment_downloads(&self, id: &str) -> Result<Option<GalleryItem>> {
        match &self.pool {
            Some(pool) => Ok(sqlx::query_as::<_, GalleryItem>(queries::INCREMENT_DOWNLOADS)
                .bind(id)
                .fetch_optional(pool)
                .await?),
            None => Ok(self
                .shim_rows(queries::INCREMENT_DOWNLOADS, &[json!(id)])
                .await?
                .into_iter()
                .next()),
        }
    }

    pub async fn count_gallery(&self) -> Result<i64> {
        match &self.pool {
            Some(pool) => Ok(sqlx::query_scalar::<_, i64>(queries::COUNT_GALLERY)
                .fetch_one(pool)
                .await?),
            None => Ok(self.shim_count(queries::COUNT_GALLERY).await),
        }
    }

    /// Returns whether a row was removed
    pub async fn delete_gallery_item(&self, id: &str) -> Result<bool> {
        let removed: Vec<GalleryItem> = match &self.pool {
            Some(pool) => {
                sqlx::query_as(queries::DELETE_GALLERY_BY_ID)
                    .bind(id)
                    .fetch_all(pool)
                    .await?
            }
            None => self.shim_rows(queries::DELETE_GALLERY_BY_ID, &[json!(id)]).await?,
        };
        Ok(!removed.is_empty())
    }

    pub async fn clear_gallery(&self) -> Result<u64> {
        let removed: Vec<GalleryItem> = match &self.pool {
            Some(pool) => sqlx::query_as(queries::DELETE_ALL_GALLERY).fetch_all(pool).await?,
            None => self.shim_rows(queries::DELETE_ALL_GALLERY, &[]).await?,
        };
        Ok(removed.len() as u64)
    }
}
