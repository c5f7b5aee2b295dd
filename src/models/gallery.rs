use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{
    MAX_CHILL_LEVEL, MAX_TAGS, MAX_TITLE_LENGTH, MIN_CHILL_LEVEL, RECOVERED_AUTHOR,
    RECOVERED_CHILL_LEVEL, RECOVERED_TAG, RECOVERED_USER_ID,
};

/// One gallery entry as known by a single storage tier
///
/// Serialized camelCase over HTTP. The aliases accept the snake_case
/// column names used by relational rows and shim rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct GalleryItem {
    pub id: String,
    pub title: String,
    #[serde(rename = "imageUrl", alias = "image_url")]
    pub image_url: String,
    #[serde(rename = "dateUploaded", alias = "date_uploaded")]
    pub date_uploaded: DateTime<Utc>,
    pub downloads: i32,
    pub author: String,
    pub tags: Vec<String>,
    #[serde(rename = "chillLevel", alias = "chill_level")]
    pub chill_level: i32,
    #[serde(rename = "userId", alias = "user_id")]
    pub user_id: String,
}

impl GalleryItem {
    /// Placeholder item for an image only known from an image host listing
    pub fn recovered(
        id: String,
        title: String,
        image_url: String,
        date_uploaded: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            title,
            image_url,
            date_uploaded: date_uploaded.unwrap_or_else(Utc::now),
            downloads: 0,
            author: RECOVERED_AUTHOR.to_string(),
            tags: vec![RECOVERED_TAG.to_string()],
            chill_level: RECOVERED_CHILL_LEVEL,
            user_id: RECOVERED_USER_ID.to_string(),
        }
    }

    /// Identity used to merge listings from different tiers
    pub fn dedupe_key(&self) -> (&str, &str) {
        (self.title.as_str(), self.author.as_str())
    }

    pub fn validate_title(title: &str) -> bool {
        let len = title.trim().chars().count();
        len > 0 && len <= MAX_TITLE_LENGTH
    }

    pub fn validate_chill_level(level: i32) -> bool {
        (MIN_CHILL_LEVEL..=MAX_CHILL_LEVEL).contains(&level)
    }

    /// Parse tags from a JSON array or a comma-separated string
    ///
    /// Tags are trimmed, lower-cased and deduplicated in first-seen order.
    pub fn parse_tags(raw: &str) -> Vec<String> {
        let raw = raw.trim();
        let candidates: Vec<String> = if raw.starts_with('[') {
            serde_json::from_str::<Vec<String>>(raw).unwrap_or_else(|_| {
                raw.trim_matches(|c| c == '[' || c == ']')
                    .split(',')
                    .map(|s| s.trim().trim_matches('"').to_string())
                    .collect()
            })
        } else {
            raw.split(',').map(str::to_string).collect()
        };

        let mut tags: Vec<String> = Vec::new();
        for tag in candidates {
            let tag = tag.trim().to_lowercase();
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
            if tags.len() == MAX_TAGS {
                break;
            }
        }
        tags
    }
}

/// Everything the upload fan-out needs to persist one image
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: bytes::Bytes,
    pub file_name: String,
    pub content_type: String,
    pub title: String,
    pub tags: Vec<String>,
    pub chill_level: i32,
    pub author: String,
    pub user_id: String,
}

impl ImageUpload {
    /// File extension derived from the original name, falling back to the mime subtype
    pub fn extension(&self) -> String {
        std::path::Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|e| e.to_lowercase())
            .or_else(|| {
                self.content_type
                    .split_once('/')
                    .map(|(_, sub)| sub.split(['+', ';']).next().unwrap_or(sub).to_string())
            })
            .unwrap_or_else(|| "bin".to_string())
    }
}
