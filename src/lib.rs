//! CreepyGallery server library
//!
//! Exports the router, shared state and storage chain so the binary and
//! the integration tests assemble the same application.

pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod security;
pub mod storage;

pub use config::Config;
pub use db::Database;
pub use error::{AppError, Result};
pub use routes::router;
pub use storage::StorageChain;

use std::sync::Arc;
use std::time::Duration;

use constants::{MEMORY_GALLERY_CAP, UPLOADS_BACKUP_CAP};
use db::{connect_or_fallback, DocumentStore};
use storage::{cdn::image_hosts_from_config, UploadsBackup};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub storage: Arc<StorageChain>,
}

impl AppState {
    /// Create a new AppState around an assembled storage chain
    pub fn new(config: Config, storage: StorageChain) -> Self {
        Self {
            config,
            db: storage.db().clone(),
            storage: Arc::new(storage),
        }
    }
}

/// Connect every configured tier and assemble the application state
///
/// Unreachable backends are logged and left out; only a broken HTTP
/// client setup is fatal.
pub async fn build_state(config: Config) -> anyhow::Result<AppState> {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.cdn_timeout_secs))
        .build()?;

    let pool = connect_or_fallback(config.database_url.as_deref()).await;
    let db = Database::new(pool);
    tracing::info!("Relational tier: {}", db.backend_name());

    let mut chain = StorageChain::new(db, MEMORY_GALLERY_CAP, http.clone());

    if let Some(path) = &config.document_store_path {
        match DocumentStore::open(path) {
            Ok(documents) => {
                tracing::info!("Document store opened at {}", path);
                chain = chain.with_documents(documents);
            }
            Err(e) => tracing::warn!("Document store unavailable at {}: {}", path, e),
        }
    }

    if config.is_production() {
        tracing::info!("Local uploads backup disabled in production");
    } else {
        tracing::info!("Local uploads backup at {}", config.uploads_backup_dir);
        chain = chain.with_local_backup(UploadsBackup::new(
            &config.uploads_backup_dir,
            UPLOADS_BACKUP_CAP,
        ));
    }

    let (primary, secondary) = image_hosts_from_config(&config, &http);
    match &primary {
        Some(host) => tracing::info!("Primary image host: {}", host.name()),
        None => tracing::warn!("No image host configured; uploads will be inlined"),
    }
    chain = chain.with_image_hosts(primary, secondary);

    Ok(AppState::new(config, chain))
}
