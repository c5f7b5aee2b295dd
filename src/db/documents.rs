//! Document tier: gallery items kept as bincode documents in an embedded redb file.

use redb::{Database, ReadableTable, ReadableTableMetadata};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::tables;
use crate::error::Result;
use crate::models::GalleryItem;

const BINCODE_CONFIG: bincode::config::Configuration = bincode::config::standard();

fn encode(item: &GalleryItem) -> Result<Vec<u8>> {
    Ok(bincode::serde::encode_to_vec(item, BINCODE_CONFIG)?)
}

fn decode(bytes: &[u8]) -> Result<GalleryItem> {
    let (item, _) = bincode::serde::decode_from_slice(bytes, BINCODE_CONFIG)?;
    Ok(item)
}

/// Handle to the document store (cheap to clone)
#[derive(Clone)]
pub struct DocumentStore {
    db: Arc<Database>,
    path: PathBuf,
}

impl DocumentStore {
    /// Open or create the redb file at the given path
    ///
    /// Creates the gallery table on first run.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        tracing::info!("Opening document store at: {:?}", path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = Database::create(&path)?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(tables::GALLERY)?;
        }
        write_txn.commit()?;

        Ok(Self {
            db: Arc::new(db),
            path,
        })
    }

    /// Size of the backing file in bytes
    pub fn file_size(&self) -> u64 {
        std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }

    pub async fn put(&self, item: &GalleryItem) -> Result<()> {
        let db = self.db.clone();
        let id = item.id.clone();
        let bytes = encode(item)?;

        tokio::task::spawn_blocking(move || -> Result<()> {
            let write_txn = db.begin_write()?;
            {
                let mut table = write_txn.open_table(tables::GALLERY)?;
                table.insert(id.as_str(), bytes.as_slice())?;
            }
            write_txn.commit()?;
            Ok(())
        })
        .await?
    }

    /// All documents, newest upload first
    pub async fn list(&self) -> Result<Vec<GalleryItem>> {
        let db = self.db.clone();

        let mut items = tokio::task::spawn_blocking(move || -> Result<Vec<GalleryItem>> {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(tables::GALLERY)?;

            let mut items = Vec::new();
            for entry in table.iter()? {
                let (_, value) = entry?;
                match decode(value.value()) {
                    Ok(item) => items.push(item),
                    Err(e) => tracing::warn!("Skipping unreadable gallery document: {}", e),
                }
            }
            Ok(items)
        })
        .await??;

        items.sort_by(|a, b| b.date_uploaded.cmp(&a.date_uploaded));
        Ok(items)
    }

    pub async fn get(&self, id: &str) -> Result<Option<GalleryItem>> {
        let db = self.db.clone();
        let id = id.to_string();

        tokio::task::spawn_blocking(move || -> Result<Option<GalleryItem>> {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(tables::GALLERY)?;
            let item = table
                .get(id.as_str())?
                .map(|bytes| decode(bytes.value()))
                .transpose()?;
            Ok(item)
        })
        .await?
    }

    /// Bump the download counter, returning the updated document if it exists
    pub async fn increment_downloads(&self, id: &str) -> Result<Option<GalleryItem>> {
        let db = self.db.clone();
        let id = id.to_string();

        tokio::task::spawn_blocking(move || -> Result<Option<GalleryItem>> {
            let write_txn = db.begin_write()?;
            let updated = {
                let mut table = write_txn.open_table(tables::GALLERY)?;
                let current = table
                    .get(id.as_str())?
                    .map(|bytes| decode(bytes.value()))
                    .transpose()?;

                match current {
                    Some(mut item) => {
                        item.downloads += 1;
                        let bytes = encode(&item)?;
                        table.insert(id.as_str(), bytes.as_slice())?;
                        Some(item)
                    }
                    None => None,
                }
            };
            write_txn.commit()?;
            Ok(updated)
        })
        .await?
    }

    /// Returns whether a document was removed
    pub async fn remove(&self, id: &str) -> Result<bool> {
        let db = self.db.clone();
        let id = id.to_string();

        tokio::task::spawn_blocking(move || -> Result<bool> {
            let write_txn = db.begin_write()?;
            let removed = {
                let mut table = write_txn.open_table(tables::GALLERY)?;
                let removed = table.remove(id.as_str())?.is_some();
                removed
            };
            write_txn.commit()?;
            Ok(removed)
        })
        .await?
    }

    /// Remove every document, returning how many there were
    pub async fn clear(&self) -> Result<u64> {
        let db = self.db.clone();

        tokio::task::spawn_blocking(move || -> Result<u64> {
            let write_txn = db.begin_write()?;
            let count = {
                let mut table = write_txn.open_table(tables::GALLERY)?;
                let mut ids = Vec::new();
                for entry in table.iter()? {
                    let (key, _) = entry?;
                    ids.push(key.value().to_string());
                }
                for id in &ids {
                    table.remove(id.as_str())?;
                }
                ids.len() as u64
            };
            write_txn.commit()?;
            Ok(count)
        })
        .await?
    }

    pub async fn len(&self) -> Result<u64> {
        let db = self.db.clone();

        tokio::task::spawn_blocking(move || -> Result<u64> {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(tables::GALLERY)?;
            Ok(table.len()?)
        })
        .await?
    }
}
