use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};

use crate::error::{AppError, Result};
use crate::AppState;

/// Filename offered to the browser: title reduced to safe characters
fn attachment_name(title: &str, content_type: &str) -> String {
    let stem: String = title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let stem = if stem.trim_matches('_').is_empty() {
        "image".to_string()
    } else {
        stem
    };

    let extension = content_type
        .split_once('/')
        .map(|(_, sub)| sub.split(['+', ';']).next().unwrap_or(sub))
        .filter(|ext| !ext.is_empty())
        .unwrap_or("bin");

    format!("{}.{}", stem, extension)
}

/// Return the image bytes and count the download
///
/// The counter goes up by one in the first tier holding the item, and
/// only once the bytes are in hand.
pub async fn download_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let item = state
        .storage
        .find_item(&id)
        .await
        .ok_or(AppError::NotFound("Image"))?;

    let (bytes, content_type) = state.storage.image_bytes(&item).await?;

    match state.storage.record_download(&id).await {
        Some((tier, updated)) => tracing::info!(
            "Download of {} counted in {:?} (now {})",
            id,
            tier,
            updated.downloads
        ),
        None => tracing::warn!("Download of {} served but not counted", id),
    }

    let disposition = format!(
        "attachment; filename=\"{}\"",
        attachment_name(&item.title, &content_type)
    );

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_LENGTH, bytes.len().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}
