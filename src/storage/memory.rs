use std::collections::VecDeque;
use tokio::sync::RwLock;

use crate::models::GalleryItem;

/// In-process tier holding the most recent uploads
///
/// Bounded: pushing past the cap evicts the oldest item.
#[derive(Debug)]
pub struct MemoryGallery {
    items: RwLock<VecDeque<GalleryItem>>,
    cap: usize,
}

impl MemoryGallery {
    pub fn new(cap: usize) -> Self {
        Self {
            items: RwLock::new(VecDeque::with_capacity(cap)),
            cap,
        }
    }

    /// Append an item, returning how many were evicted
    pub async fn push(&self, item: GalleryItem) -> usize {
        let mut items = self.items.write().await;
        items.push_back(item);

        let mut evicted = 0;
        while items.len() > self.cap {
            items.pop_front();
            evicted += 1;
        }
        if evicted > 0 {
            tracing::debug!("Memory gallery evicted {} oldest item(s)", evicted);
        }
        evicted
    }

    /// Snapshot, newest first
    pub async fn list(&self) -> Vec<GalleryItem> {
        self.items.read().await.iter().rev().cloned().collect()
    }

    pub async fn get(&self, id: &str) -> Option<GalleryItem> {
        self.items.read().await.iter().find(|i| i.id == id).cloned()
    }

    pub async fn increment_downloads(&self, id: &str) -> Option<GalleryItem> {
        let mut items = self.items.write().await;
        let item = items.iter_mut().find(|i| i.id == id)?;
        item.downloads += 1;
        Some(item.clone())
    }

    pub async fn remove(&self, id: &str) -> bool {
        let mut items = self.items.write().await;
        let before = items.len();
        items.retain(|i| i.id != id);
        items.len() != before
    }

    pub async fn clear(&self) -> u64 {
        let mut items = self.items.write().await;
        let count = items.len() as u64;
        items.clear();
        count
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }
}
