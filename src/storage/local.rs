use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tokio::fs;

use crate::error::Result;
use crate::models::{GalleryItem, ImageUpload};

/// JSON written next to every backed-up image
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSidecar {
    pub item: GalleryItem,
    /// Name of the image file inside the backup folder
    pub file_name: String,
    pub original_name: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub sha256: String,
    pub saved_at: DateTime<Utc>,
}

/// Ids double as file names, so only plain characters are accepted
fn is_safe_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Sidecar file suffix; image extensions never contain a dot, so no image can collide
const SIDECAR_SUFFIX: &str = ".meta.json";

/// Flat-file tier: raw image bytes plus a JSON sidecar per item
///
/// Each item is stored as `{dir}/{id}.{ext}` and `{dir}/{id}.meta.json`.
/// Bounded: once over the cap, the oldest uploads are deleted.
#[derive(Debug, Clone)]
pub struct UploadsBackup {
    dir: PathBuf,
    cap: usize,
}

impl UploadsBackup {
    pub fn new(dir: impl Into<PathBuf>, cap: usize) -> Self {
        Self {
            dir: dir.into(),
            cap,
        }
    }

    fn sidecar_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}{}", id, SIDECAR_SUFFIX))
    }

    /// Copy the upload and its metadata into the backup folder
    pub async fn save(&self, item: &GalleryItem, upload: &ImageUpload) -> Result<()> {
        if !is_safe_id(&item.id) {
            return Err(crate::error::AppError::InvalidInput(format!(
                "Unsafe backup id: {}",
                item.id
            )));
        }

        fs::create_dir_all(&self.dir).await?;

        let file_name = format!("{}.{}", item.id, upload.extension());
        fs::write(self.dir.join(&file_name), &upload.bytes).await?;

        let sidecar = BackupSidecar {
            item: item.clone(),
            file_name,
            original_name: upload.file_name.clone(),
            content_type: upload.content_type.clone(),
            size_bytes: upload.bytes.len() as u64,
            sha256: hex::encode(Sha256::digest(&upload.bytes)),
            saved_at: Utc::now(),
        };
        fs::write(
            self.sidecar_path(&item.id),
            serde_json::to_vec_pretty(&sidecar)?,
        )
        .await?;

        let removed = self.enforce_cap().await?;
        if removed > 0 {
            tracing::info!("Uploads backup pruned {} oldest item(s)", removed);
        }
        Ok(())
    }

    /// Every readable sidecar, oldest upload first
    async fn sidecars(&self) -> Result<Vec<BackupSidecar>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut sidecars = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_sidecar = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.ends_with(SIDECAR_SUFFIX))
                .unwrap_or(false);
            if !is_sidecar {
                continue;
            }
            let bytes = fs::read(&path).await?;
            match serde_json::from_slice::<BackupSidecar>(&bytes) {
                Ok(sidecar) => sidecars.push(sidecar),
                Err(e) => tracing::warn!("Skipping unreadable sidecar {:?}: {}", path, e),
            }
        }

        sidecars.sort_by(|a, b| {
            a.item
                .date_uploaded
                .cmp(&b.item.date_uploaded)
                .then(a.saved_at.cmp(&b.saved_at))
        });
        Ok(sidecars)
    }

    async fn delete_files(&self, sidecar: &BackupSidecar) -> Result<()> {
        for path in [
            self.dir.join(&sidecar.file_name),
            self.sidecar_path(&sidecar.item.id),
        ] {
            match fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Delete oldest items until at most `cap` remain
    pub async fn enforce_cap(&self) -> Result<usize> {
        let sidecars = self.sidecars().await?;
        let excess = sidecars.len().saturating_sub(self.cap);
        for sidecar in sidecars.iter().take(excess) {
            self.delete_files(sidecar).await?;
        }
        Ok(excess)
    }

    /// Backed-up items, newest first
    pub async fn list(&self) -> Result<Vec<GalleryItem>> {
        Ok(self
            .sidecars()
            .await?
            .into_iter()
            .rev()
            .map(|s| s.item)
            .collect())
    }

    pub async fn get(&self, id: &str) -> Result<Option<BackupSidecar>> {
        if !is_safe_id(id) {
            return Ok(None);
        }
        match fs::read(self.sidecar_path(id)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Raw image bytes and content type for an item, if backed up
    pub async fn read_image(&self, id: &str) -> Result<Option<(Vec<u8>, String)>> {
        let Some(sidecar) = self.get(id).await? else {
            return Ok(None);
        };
        match fs::read(self.dir.join(&sidecar.file_name)).await {
            Ok(bytes) => Ok(Some((bytes, sidecar.content_type))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn increment_downloads(&self, id: &str) -> Result<Option<GalleryItem>> {
        let Some(mut sidecar) = self.get(id).await? else {
            return Ok(None);
        };
        sidecar.item.downloads += 1;
        fs::write(self.sidecar_path(id), serde_json::to_vec_pretty(&sidecar)?).await?;
        Ok(Some(sidecar.item))
    }

    pub async fn remove(&self, id: &str) -> Result<bool> {
        match self.get(id).await? {
            Some(sidecar) => {
                self.delete_files(&sidecar).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn clear(&self) -> Result<u64> {
        let sidecars = self.sidecars().await?;
        for sidecar in &sidecars {
            self.delete_files(sidecar).await?;
        }
        Ok(sidecars.len() as u64)
    }

    pub async fn len(&self) -> Result<usize> {
        Ok(self.sidecars().await?.len())
    }

    /// Total bytes of backed-up images
    pub async fn disk_usage(&self) -> Result<u64> {
        Ok(self.sidecars().await?.iter().map(|s| s.size_bytes).sum())
    }
}
