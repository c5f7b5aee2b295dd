use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::User;
use crate::security::verify_admin_key;
use crate::storage::{Tier, TierCounts, TierListing};
use crate::AppState;

/// Query parameters shared by the admin endpoints
#[derive(Debug, Default, Deserialize)]
pub struct AdminQuery {
    /// Admin secret key
    pub key: Option<String>,
    /// Target record for single-item deletes
    pub id: Option<String>,
}

impl AdminQuery {
    fn authorize(&self, state: &AppState) -> Result<()> {
        verify_admin_key(
            state.config.admin_secret_key.as_deref(),
            self.key.as_deref(),
        )
    }
}

#[derive(Debug, Serialize)]
pub struct UsersDeleted {
    pub removed: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDeleted {
    pub id: String,
    pub removed_from: Vec<Tier>,
}

#[derive(Debug, Serialize)]
pub struct TierCleared {
    pub tier: Tier,
    pub removed: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStatsResponse {
    pub backend: &'static str,
    pub user_count: Option<i64>,
    pub gallery: TierCounts,
    pub document_store_size_bytes: u64,
    pub document_store_size_human: String,
    pub uploads_backup_size_bytes: u64,
    pub uploads_backup_size_human: String,
}

/// Format bytes into human-readable string
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// GET /api/admin/users?key=
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<AdminQuery>,
) -> Result<Json<Vec<User>>> {
    params.authorize(&state)?;

    let users = state.db.list_users().await?;
    Ok(Json(users.into_iter().map(User::from).collect()))
}

/// DELETE /api/admin/users?key=[&id=]
///
/// Without `id` every account is removed.
pub async fn delete_users(
    State(state): State<AppState>,
    Query(params): Query<AdminQuery>,
) -> Result<Json<UsersDeleted>> {
    params.authorize(&state)?;

    let removed = match params.id.as_deref() {
        Some(id) => {
            if !state.db.delete_user(id).await? {
                return Err(AppError::NotFound("User"));
            }
            tracing::info!("Admin deleted user {}", id);
            1
        }
        None => {
            let removed = state.db.delete_all_users().await?;
            tracing::warn!("Admin deleted all {} users", removed);
            removed
        }
    };

    Ok(Json(UsersDeleted { removed }))
}

/// GET /api/admin/gallery?key=
pub async fn list_gallery_tiers(
    State(state): State<AppState>,
    Query(params): Query<AdminQuery>,
) -> Result<Json<Vec<TierListing>>> {
    params.authorize(&state)?;
    Ok(Json(state.storage.list_by_tier().await))
}

/// DELETE /api/admin/gallery?key=&id=
///
/// Removes the metadata from every tier; hosted image files stay put.
pub async fn delete_gallery_item(
    State(state): State<AppState>,
    Query(params): Query<AdminQuery>,
) -> Result<Json<ItemDeleted>> {
    params.authorize(&state)?;

    let id = params
        .id
        .ok_or_else(|| AppError::InvalidInput("id is required".to_string()))?;

    let removed_from = state.storage.delete_item(&id).await;
    if removed_from.is_empty() {
        return Err(AppError::NotFound("Image"));
    }

    tracing::info!("Admin deleted image {} from {:?}", id, removed_from);

    Ok(Json(ItemDeleted { id, removed_from }))
}

/// DELETE /api/admin/clear-memory?key=
pub async fn clear_memory(
    State(state): State<AppState>,
    Query(params): Query<AdminQuery>,
) -> Result<Json<TierCleared>> {
    params.authorize(&state)?;

    let removed = state.storage.memory().clear().await;
    tracing::warn!("Admin cleared {} items from memory", removed);

    Ok(Json(TierCleared {
        tier: Tier::Memory,
        removed,
    }))
}

/// DELETE /api/admin/clear-uploads?key=
pub async fn clear_uploads(
    State(state): State<AppState>,
    Query(params): Query<AdminQuery>,
) -> Result<Json<TierCleared>> {
    params.authorize(&state)?;

    let removed = match state.storage.local_backup() {
        Some(local) => local.clear().await?,
        None => 0,
    };
    tracing::warn!("Admin cleared {} items from the uploads backup", removed);

    Ok(Json(TierCleared {
        tier: Tier::LocalBackup,
        removed,
    }))
}

/// DELETE /api/admin/clear-gallery?key=
pub async fn clear_gallery(
    State(state): State<AppState>,
    Query(params): Query<AdminQuery>,
) -> Result<Json<TierCleared>> {
    params.authorize(&state)?;

    let removed = state.db.clear_gallery().await?;
    tracing::warn!("Admin cleared {} gallery rows", removed);

    Ok(Json(TierCleared {
        tier: Tier::Relational,
        removed,
    }))
}

/// DELETE /api/admin/clear-documents?key=
pub async fn clear_documents(
    State(state): State<AppState>,
    Query(params): Query<AdminQuery>,
) -> Result<Json<TierCleared>> {
    params.authorize(&state)?;

    let removed = match state.storage.documents() {
        Some(documents) => documents.clear().await?,
        None => 0,
    };
    tracing::warn!("Admin cleared {} documents", removed);

    Ok(Json(TierCleared {
        tier: Tier::Documents,
        removed,
    }))
}

/// Admin stats endpoint
///
/// Returns per-tier counts and on-disk sizes for monitoring.
///
/// GET /api/admin/stats?key=<admin_secret_key>
pub async fn admin_stats(
    State(state): State<AppState>,
    Query(params): Query<AdminQuery>,
) -> Result<Json<AdminStatsResponse>> {
    params.authorize(&state)?;

    let user_count = match state.db.count_users().await {
        Ok(count) => Some(count),
        Err(e) => {
            tracing::warn!("Could not count users: {}", e);
            None
        }
    };

    let gallery = state.storage.tier_counts().await;

    let document_store_size_bytes = state
        .storage
        .documents()
        .map(|documents| documents.file_size())
        .unwrap_or(0);

    let uploads_backup_size_bytes = match state.storage.local_backup() {
        Some(local) => local.disk_usage().await.unwrap_or(0),
        None => 0,
    };

    tracing::info!(
        "Admin stats requested: {:?} users, {} in memory, {} document store",
        user_count,
        gallery.memory,
        format_bytes(document_store_size_bytes)
    );

    Ok(Json(AdminStatsResponse {
        backend: state.db.backend_name(),
        user_count,
        gallery,
        document_store_size_bytes,
        document_store_size_human: format_bytes(document_store_size_bytes),
        uploads_backup_size_bytes,
        uploads_backup_size_human: format_bytes(uploads_backup_size_bytes),
    }))
}
