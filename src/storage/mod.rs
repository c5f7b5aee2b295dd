//! Multi-tier storage fallback chain for gallery images.
//!
//! Uploads fan out sequentially to every available tier, tolerating
//! partial failure without rollback. Listings are rebuilt by querying
//! every tier and merging on `(title, author)`.

pub mod cdn;
pub mod local;
pub mod memory;

use chrono::Utc;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::constants::MAX_INLINE_IMAGE_BYTES;
use crate::db::{Database, DocumentStore};
use crate::error::{AppError, Result};
use crate::models::{GalleryItem, ImageUpload};

pub use cdn::{HostedImage, ImageHost};
pub use local::UploadsBackup;
pub use memory::MemoryGallery;

/// One storage destination in the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tier {
    ImageHost,
    Relational,
    Documents,
    Memory,
    LocalBackup,
}

/// What a single upload fan-out achieved
#[derive(Debug, Clone)]
pub struct SaveOutcome {
    /// The relational row when that insert succeeded, otherwise the in-memory copy
    pub item: GalleryItem,
    pub cdn_uploaded: bool,
    /// Tiers that accepted the write, in call order
    pub accepted_by: Vec<Tier>,
}

/// Items currently held by one tier
#[derive(Debug, Clone, Serialize)]
pub struct TierListing {
    pub tier: Tier,
    pub items: Vec<GalleryItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-tier item counts; `None` when the tier is disabled or failed
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierCounts {
    pub relational: Option<i64>,
    pub documents: Option<u64>,
    pub memory: usize,
    pub local_backup: Option<usize>,
}

/// Drop every item whose `(title, author)` already appeared earlier in the list
pub fn dedupe_by_title_author(items: Vec<GalleryItem>) -> Vec<GalleryItem> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    items
        .into_iter()
        .filter(|item| {
            let (title, author) = item.dedupe_key();
            seen.insert((title.to_string(), author.to_string()))
        })
        .collect()
}

/// The ordered set of storage tiers
pub struct StorageChain {
    db: Database,
    documents: Option<DocumentStore>,
    memory: MemoryGallery,
    local: Option<UploadsBackup>,
    primary_host: Option<Arc<dyn ImageHost>>,
    secondary_host: Option<Arc<dyn ImageHost>>,
    http: reqwest::Client,
}

impl StorageChain {
    /// Chain with only the relational and memory tiers
    pub fn new(db: Database, memory_cap: usize, http: reqwest::Client) -> Self {
        Self {
            db,
            documents: None,
            memory: MemoryGallery::new(memory_cap),
            local: None,
            primary_host: None,
            secondary_host: None,
            http,
        }
    }

    pub fn with_documents(mut self, documents: DocumentStore) -> Self {
        self.documents = Some(documents);
        self
    }

    pub fn with_local_backup(mut self, local: UploadsBackup) -> Self {
        self.local = Some(local);
        self
    }

    /// Uploads go to `primary`; both hosts are queried during recovery
    pub fn with_image_hosts(
        mut self,
        primary: Option<Arc<dyn ImageHost>>,
        secondary: Option<Arc<dyn ImageHost>>,
    ) -> Self {
        self.primary_host = primary;
        self.secondary_host = secondary;
        self
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn documents(&self) -> Option<&DocumentStore> {
        self.documents.as_ref()
    }

    pub fn memory(&self) -> &MemoryGallery {
        &self.memory
    }

    pub fn local_backup(&self) -> Option<&UploadsBackup> {
        self.local.as_ref()
    }

    async fn upload_to_host(&self, id: &str, upload: &ImageUpload) -> Option<String> {
        let Some(host) = &self.primary_host else {
            tracing::debug!("No image host configured");
            return None;
        };

        match host.upload(id, upload).await {
            Ok(hosted) => {
                tracing::info!("Image {} uploaded to {}", id, host.name());
                Some(hosted.url)
            }
            Err(e) => {
                tracing::warn!("Image host {} rejected upload {}: {}", host.name(), id, e);
                None
            }
        }
    }

    /// Persist one upload to every available tier
    ///
    /// Fails only when the image host is unavailable and the image is too
    /// large to inline. The memory tier always accepts the write.
    pub async fn save_image_permanently(&self, upload: ImageUpload) -> Result<SaveOutcome> {
        let id = Uuid::new_v4().to_string();
        let mut accepted_by = Vec::new();

        // 1. Image host, or an inline data URI for small images
        let (image_url, cdn_uploaded) = match self.upload_to_host(&id, &upload).await {
            Some(url) => {
                accepted_by.push(Tier::ImageHost);
                (url, true)
            }
            None if upload.bytes.len() <= MAX_INLINE_IMAGE_BYTES => {
                tracing::info!(
                    "Inlining image {} as data URI ({} bytes)",
                    id,
                    upload.bytes.len()
                );
                (cdn::to_data_uri(&upload.content_type, &upload.bytes), false)
            }
            None => {
                return Err(AppError::StorageUnavailable(format!(
                    "Image host unavailable and image of {} bytes exceeds the {} byte inline limit",
                    upload.bytes.len(),
                    MAX_INLINE_IMAGE_BYTES
                )));
            }
        };

        let item = GalleryItem {
            id: id.clone(),
            title: upload.title.clone(),
            image_url,
            date_uploaded: Utc::now(),
            downloads: 0,
            author: upload.author.clone(),
            tags: upload.tags.clone(),
            chill_level: upload.chill_level,
            user_id: upload.user_id.clone(),
        };

        // 2. Relational row
        let relational = match self.db.insert_gallery_item(&item).await {
            Ok(row) => {
                accepted_by.push(Tier::Relational);
                Some(row)
            }
            Err(e) => {
                tracing::warn!("Relational insert failed for {}: {}", id, e);
                None
            }
        };

        // 3. Document store
        if let Some(documents) = &self.documents {
            match documents.put(&item).await {
                Ok(()) => accepted_by.push(Tier::Documents),
                Err(e) => tracing::warn!("Document store write failed for {}: {}", id, e),
            }
        }

        // 4. Memory, unconditionally
        self.memory.push(item.clone()).await;
        accepted_by.push(Tier::Memory);

        // 5. Local backup (only wired up outside production)
        if let Some(local) = &self.local {
            match local.save(&item, &upload).await {
                Ok(()) => accepted_by.push(Tier::LocalBackup),
                Err(e) => tracing::warn!("Local backup failed for {}: {}", id, e),
            }
        }

        tracing::info!("Image {} saved to {:?}", id, accepted_by);

        Ok(SaveOutcome {
            item: relational.unwrap_or(item),
            cdn_uploaded,
            accepted_by,
        })
    }

    async fn host_items(&self, host: &Option<Arc<dyn ImageHost>>) -> Vec<GalleryItem> {
        let Some(host) = host else {
            return Vec::new();
        };
        match host.list().await {
            Ok(images) => images
                .into_iter()
                .map(|h| GalleryItem::recovered(h.id, h.name, h.url, h.created_at))
                .collect(),
            Err(e) => {
                tracing::warn!("Listing image host {} failed: {}", host.name(), e);
                Vec::new()
            }
        }
    }

    /// Best-effort gallery rebuilt from every tier
    ///
    /// Order is tier call order; the first `(title, author)` occurrence wins.
    pub async fn recover_all_images(&self) -> Vec<GalleryItem> {
        let mut all = Vec::new();

        match self.db.list_gallery().await {
            Ok(items) => all.extend(items),
            Err(e) => tracing::warn!("Relational listing failed: {}", e),
        }

        if let Some(documents) = &self.documents {
            match documents.list().await {
                Ok(items) => all.extend(items),
                Err(e) => tracing::warn!("Document store listing failed: {}", e),
            }
        }

        all.extend(self.memory.list().await);

        if let Some(local) = &self.local {
            match local.list().await {
                Ok(items) => all.extend(items),
                Err(e) => tracing::warn!("Local backup listing failed: {}", e),
            }
        }

        all.extend(self.host_items(&self.primary_host).await);
        all.extend(self.host_items(&self.secondary_host).await);

        let total = all.len();
        let merged = dedupe_by_title_author(all);
        tracing::debug!("Recovered {} gallery items from {} listings", merged.len(), total);
        merged
    }

    /// First metadata tier copy of an item, searched in fan-out order
    pub async fn find_item(&self, id: &str) -> Option<GalleryItem> {
        match self.db.get_gallery_item(id).await {
            Ok(Some(item)) => return Some(item),
            Ok(None) => {}
            Err(e) => tracing::warn!("Relational lookup failed for {}: {}", id, e),
        }

        if let Some(documents) = &self.documents {
            match documents.get(id).await {
                Ok(Some(item)) => return Some(item),
                Ok(None) => {}
                Err(e) => tracing::warn!("Document lookup failed for {}: {}", id, e),
            }
        }

        if let Some(item) = self.memory.get(id).await {
            return Some(item);
        }

        if let Some(local) = &self.local {
            match local.get(id).await {
                Ok(Some(sidecar)) => return Some(sidecar.item),
                Ok(None) => {}
                Err(e) => tracing::warn!("Local lookup failed for {}: {}", id, e),
            }
        }

        None
    }

    /// Bump `downloads` in the first metadata tier holding the id
    pub async fn record_download(&self, id: &str) -> Option<(Tier, GalleryItem)> {
        match self.db.increment_downloads(id).await {
            Ok(Some(item)) => return Some((Tier::Relational, item)),
            Ok(None) => {}
            Err(e) => tracing::warn!("Relational download count failed for {}: {}", id, e),
        }

        if let Some(documents) = &self.documents {
            match documents.increment_downloads(id).await {
                Ok(Some(item)) => return Some((Tier::Documents, item)),
                Ok(None) => {}
                Err(e) => tracing::warn!("Document download count failed for {}: {}", id, e),
            }
        }

        if let Some(item) = self.memory.increment_downloads(id).await {
            return Some((Tier::Memory, item));
        }

        if let Some(local) = &self.local {
            match local.increment_downloads(id).await {
                Ok(Some(item)) => return Some((Tier::LocalBackup, item)),
                Ok(None) => {}
                Err(e) => tracing::warn!("Local download count failed for {}: {}", id, e),
            }
        }

        None
    }

    /// Image bytes and content type: local copy, inline data, or a fetch of the remote URL
    pub async fn image_bytes(&self, item: &GalleryItem) -> Result<(Vec<u8>, String)> {
        if let Some(local) = &self.local {
            match local.read_image(&item.id).await {
                Ok(Some(found)) => return Ok(found),
                Ok(None) => {}
                Err(e) => tracing::warn!("Reading local copy of {} failed: {}", item.id, e),
            }
        }

        if let Some(inline) = cdn::parse_data_uri(&item.image_url) {
            return Ok((inline.1, inline.0));
        }

        if item.image_url.starts_with("http://") || item.image_url.starts_with("https://") {
            let response = self.http.get(&item.image_url).send().await?;
            if !response.status().is_success() {
                tracing::warn!(
                    "Fetching {} returned {}",
                    item.image_url,
                    response.status()
                );
                return Err(AppError::NotFound("Image"));
            }
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = response.bytes().await?;
            return Ok((bytes.to_vec(), content_type));
        }

        Err(AppError::NotFound("Image"))
    }

    /// Remove an item's metadata from every tier that holds it (image hosts untouched)
    pub async fn delete_item(&self, id: &str) -> Vec<Tier> {
        let mut removed = Vec::new();

        match self.db.delete_gallery_item(id).await {
            Ok(true) => removed.push(Tier::Relational),
            Ok(false) => {}
            Err(e) => tracing::warn!("Relational delete failed for {}: {}", id, e),
        }

        if let Some(documents) = &self.documents {
            match documents.remove(id).await {
                Ok(true) => removed.push(Tier::Documents),
                Ok(false) => {}
                Err(e) => tracing::warn!("Document delete failed for {}: {}", id, e),
            }
        }

        if self.memory.remove(id).await {
            removed.push(Tier::Memory);
        }

        if let Some(local) = &self.local {
            match local.remove(id).await {
                Ok(true) => removed.push(Tier::LocalBackup),
                Ok(false) => {}
                Err(e) => tracing::warn!("Local delete failed for {}: {}", id, e),
            }
        }

        removed
    }

    /// Every metadata tier's own listing, without merging
    pub async fn list_by_tier(&self) -> Vec<TierListing> {
        fn listing(tier: Tier, result: Result<Vec<GalleryItem>>) -> TierListing {
            match result {
                Ok(items) => TierListing {
                    tier,
                    items,
                    error: None,
                },
                Err(e) => TierListing {
                    tier,
                    items: Vec::new(),
                    error: Some(e.to_string()),
                },
            }
        }

        let mut listings = vec![listing(Tier::Relational, self.db.list_gallery().await)];
        if let Some(documents) = &self.documents {
            listings.push(listing(Tier::Documents, documents.list().await));
        }
        listings.push(listing(Tier::Memory, Ok(self.memory.list().await)));
        if let Some(local) = &self.local {
            listings.push(listing(Tier::LocalBackup, local.list().await));
        }
        listings
    }

    pub async fn tier_counts(&self) -> TierCounts {
        let documents = match &self.documents {
            Some(documents) => documents.len().await.ok(),
            None => None,
        };
        let local_backup = match &self.local {
            Some(local) => local.len().await.ok(),
            None => None,
        };

        TierCounts {
            relational: self.db.count_gallery().await.ok(),
            documents,
            memory: self.memory.len().await,
            local_backup,
        }
    }
}
