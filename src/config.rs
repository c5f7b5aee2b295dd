use std::env;

use crate::constants::{DEFAULT_CDN_TIMEOUT_SECS, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_TOKEN_TTL_HOURS};

/// Which configured image host receives uploads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageHostKind {
    Cloudinary,
    ImageKit,
}

/// Cloudinary credentials
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

/// ImageKit credentials
#[derive(Debug, Clone)]
pub struct ImageKitConfig {
    pub private_key: String,
    pub url_endpoint: String,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub environment: String,
    pub allowed_origins: Vec<String>,
    /// Postgres connection string; `None` routes queries through the SQL shim
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    /// Admin secret; `None` disables the admin endpoints
    pub admin_secret_key: Option<String>,
    /// redb document store file; `None` disables the tier
    pub document_store_path: Option<String>,
    pub uploads_backup_dir: String,
    pub max_upload_bytes: usize,
    pub cdn_timeout_secs: u64,
    pub primary_image_host: ImageHostKind,
    pub cloudinary: Option<CloudinaryConfig>,
    pub imagekit: Option<ImageKitConfig>,
    pub log_requests: bool,
}

/// Read an optional variable, treating empty values as unset
fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if it exists (development)
        dotenvy::dotenv().ok();

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| "Invalid SERVER_PORT")?;

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let database_url = optional_var("DATABASE_URL");

        let jwt_secret = optional_var("JWT_SECRET")
            .ok_or("JWT_SECRET must be set for signing session tokens")?;

        let token_ttl_hours = match optional_var("TOKEN_TTL_HOURS") {
            Some(v) => v.parse().map_err(|_| "Invalid TOKEN_TTL_HOURS")?,
            None => DEFAULT_TOKEN_TTL_HOURS,
        };

        let admin_secret_key = optional_var("ADMIN_SECRET_KEY");

        let document_store_path = match env::var("DOCUMENT_STORE_PATH") {
            Ok(v) if v.trim().is_empty() => None,
            Ok(v) => Some(v.trim().to_string()),
            Err(_) => Some("./data/documents.redb".to_string()),
        };

        let uploads_backup_dir =
            optional_var("UPLOADS_BACKUP_DIR").unwrap_or_else(|| "./uploads-backup".to_string());

        let max_upload_bytes = match optional_var("MAX_UPLOAD_BYTES") {
            Some(v) => v.parse().map_err(|_| "Invalid MAX_UPLOAD_BYTES")?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let cdn_timeout_secs = match optional_var("CDN_TIMEOUT_SECS") {
            Some(v) => v.parse().map_err(|_| "Invalid CDN_TIMEOUT_SECS")?,
            None => DEFAULT_CDN_TIMEOUT_SECS,
        };

        let primary_image_host = match optional_var("PRIMARY_IMAGE_HOST")
            .unwrap_or_else(|| "cloudinary".to_string())
            .to_lowercase()
            .as_str()
        {
            "cloudinary" => ImageHostKind::Cloudinary,
            "imagekit" => ImageHostKind::ImageKit,
            _ => return Err("Invalid PRIMARY_IMAGE_HOST (expected cloudinary or imagekit)".to_string()),
        };

        let cloudinary = match (
            optional_var("CLOUDINARY_CLOUD_NAME"),
            optional_var("CLOUDINARY_API_KEY"),
            optional_var("CLOUDINARY_API_SECRET"),
        ) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CloudinaryConfig {
                cloud_name,
                api_key,
                api_secret,
            }),
            _ => None,
        };

        let imagekit = match (
            optional_var("IMAGEKIT_PRIVATE_KEY"),
            optional_var("IMAGEKIT_URL_ENDPOINT"),
        ) {
            (Some(private_key), Some(url_endpoint)) => Some(ImageKitConfig {
                private_key,
                url_endpoint,
            }),
            _ => None,
        };

        let log_requests = optional_var("LOG_REQUESTS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Ok(Config {
            server_host,
            server_port,
            environment,
            allowed_origins,
            database_url,
            jwt_secret,
            token_ttl_hours,
            admin_secret_key,
            document_store_path,
            uploads_backup_dir,
            max_upload_bytes,
            cdn_timeout_secs,
            primary_image_host,
            cloudinary,
            imagekit,
            log_requests,
        })
    }

    /// Get server address as string
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// The local uploads backup only runs outside production
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}
