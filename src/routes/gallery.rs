use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};

use crate::error::Result;
use crate::models::GalleryItem;
use crate::routes::validation::{UploadForm, UploadedFile};
use crate::security::AuthUser;
use crate::AppState;

/// Merged gallery across every storage tier
///
/// An empty list means either nothing was uploaded or no tier answered.
pub async fn list_gallery(State(state): State<AppState>) -> Json<Vec<GalleryItem>> {
    Json(state.storage.recover_all_images().await)
}

/// Upload an image with metadata
///
/// Multipart fields: `title`, `tags` (comma list or JSON array),
/// `chillLevel` (1-5) and `file`. The caller becomes the author.
pub async fn upload_image(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<GalleryItem>)> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => form.title = Some(field.text().await?),
            "tags" => form.tags = Some(field.text().await?),
            "chillLevel" | "chill_level" => form.chill_level = Some(field.text().await?),
            "file" | "image" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await?;
                form.file = Some(UploadedFile {
                    bytes,
                    file_name,
                    content_type,
                });
            }
            other => tracing::debug!("Ignoring unexpected upload field: {}", other),
        }
    }

    let upload = form.into_upload(&claims)?;

    tracing::info!(
        "Upload from {}: '{}' ({} bytes)",
        claims.sub,
        upload.title,
        upload.bytes.len()
    );

    let outcome = state.storage.save_image_permanently(upload).await?;

    Ok((StatusCode::CREATED, Json(outcome.item)))
}
