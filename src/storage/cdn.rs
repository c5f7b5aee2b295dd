//! Image host tier: remote CDNs reached over their upload and listing APIs.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::config::{CloudinaryConfig, Config, ImageHostKind, ImageKitConfig};
use crate::constants::IMAGE_HOST_FOLDER;
use crate::error::{AppError, Result};
use crate::models::ImageUpload;

/// An image as reported by a host
#[derive(Debug, Clone, PartialEq)]
pub struct HostedImage {
    /// Upload id recovered from the hosted filename
    pub id: String,
    pub url: String,
    /// Filename stem, the only metadata a host keeps
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// A remote image CDN
#[async_trait]
pub trait ImageHost: Send + Sync {
    fn name(&self) -> &'static str;

    /// Store the bytes under the given upload id
    async fn upload(&self, id: &str, upload: &ImageUpload) -> Result<HostedImage>;

    /// Everything stored in the app's folder
    async fn list(&self) -> Result<Vec<HostedImage>>;
}

/// Build the primary and secondary hosts from whatever credentials are configured
pub fn image_hosts_from_config(
    config: &Config,
    client: &reqwest::Client,
) -> (Option<Arc<dyn ImageHost>>, Option<Arc<dyn ImageHost>>) {
    let cloudinary = config.cloudinary.clone().map(|c| {
        Arc::new(CloudinaryHost::new(client.clone(), c)) as Arc<dyn ImageHost>
    });
    let imagekit = config
        .imagekit
        .clone()
        .map(|c| Arc::new(ImageKitHost::new(client.clone(), c)) as Arc<dyn ImageHost>);

    match config.primary_image_host {
        ImageHostKind::Cloudinary => (cloudinary, imagekit),
        ImageHostKind::ImageKit => (imagekit, cloudinary),
    }
}

// =============================================================================
// Data URIs
// =============================================================================

/// Inline bytes as `data:<mime>;base64,<payload>`
pub fn to_data_uri(content_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", content_type, STANDARD.encode(bytes))
}

/// Split a base64 data URI into its content type and decoded bytes
pub fn parse_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    let rest = uri.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    let content_type = meta.strip_suffix(";base64")?;
    let bytes = STANDARD.decode(payload).ok()?;
    let content_type = if content_type.is_empty() {
        "application/octet-stream".to_string()
    } else {
        content_type.to_string()
    };
    Some((content_type, bytes))
}

/// Last path segment without its extension
fn file_stem(path: &str) -> String {
    let segment = path.rsplit('/').next().unwrap_or(path);
    match segment.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => segment.to_string(),
    }
}

async fn ensure_success(response: reqwest::Response, host: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AppError::ImageHost(format!(
        "{} responded with {}: {}",
        host, status, body
    )))
}

fn file_part(upload: &ImageUpload, file_name: String) -> Result<Part> {
    Ok(Part::bytes(upload.bytes.to_vec())
        .file_name(file_name)
        .mime_str(&upload.content_type)?)
}

// =============================================================================
// Cloudinary
// =============================================================================

#[derive(Debug, Deserialize)]
struct CloudinaryResource {
    public_id: String,
    secure_url: String,
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct CloudinaryListing {
    #[serde(default)]
    resources: Vec<CloudinaryResource>,
}

impl From<CloudinaryResource> for HostedImage {
    fn from(resource: CloudinaryResource) -> Self {
        let stem = file_stem(&resource.public_id);
        Self {
            id: stem.clone(),
            url: resource.secure_url,
            name: stem,
            created_at: resource.created_at,
        }
    }
}

/// Cloudinary signed upload and admin listing API
pub struct CloudinaryHost {
    client: reqwest::Client,
    config: CloudinaryConfig,
}

impl CloudinaryHost {
    pub fn new(client: reqwest::Client, config: CloudinaryConfig) -> Self {
        Self { client, config }
    }

    fn api_url(&self, path: &str) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/{}",
            self.config.cloud_name, path
        )
    }

    /// SHA-256 over the alphabetically sorted `key=value` pairs followed by the secret
    pub fn sign(params: &[(&str, String)], api_secret: &str) -> String {
        let mut sorted: Vec<&(&str, String)> = params.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        let joined = sorted
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let mut hasher = Sha256::new();
        hasher.update(joined.as_bytes());
        hasher.update(api_secret.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[async_trait]
impl ImageHost for CloudinaryHost {
    fn name(&self) -> &'static str {
        "cloudinary"
    }

    async fn upload(&self, id: &str, upload: &ImageUpload) -> Result<HostedImage> {
        let timestamp = Utc::now().timestamp().to_string();
        let params = [
            ("folder", IMAGE_HOST_FOLDER.to_string()),
            ("public_id", id.to_string()),
            ("timestamp", timestamp.clone()),
        ];
        let signature = Self::sign(&params, &self.config.api_secret);

        let form = Form::new()
            .part("file", file_part(upload, upload.file_name.clone())?)
            .text("api_key", self.config.api_key.clone())
            .text("folder", IMAGE_HOST_FOLDER)
            .text("public_id", id.to_string())
            .text("timestamp", timestamp)
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let response = self
            .client
            .post(self.api_url("image/upload"))
            .multipart(form)
            .send()
            .await?;
        let resource: CloudinaryResource = ensure_success(response, self.name())
            .await?
            .json()
            .await?;

        Ok(resource.into())
    }

    async fn list(&self) -> Result<Vec<HostedImage>> {
        let response = self
            .client
            .get(self.api_url("resources/image/upload"))
            .basic_auth(&self.config.api_key, Some(&self.config.api_secret))
            .query(&[
                ("prefix", format!("{}/", IMAGE_HOST_FOLDER)),
                ("max_results", "500".to_string()),
            ])
            .send()
            .await?;
        let listing: CloudinaryListing = ensure_success(response, self.name())
            .await?
            .json()
            .await?;

        Ok(listing.resources.into_iter().map(HostedImage::from).collect())
    }
}

// =============================================================================
// ImageKit
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageKitFile {
    name: String,
    url: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

/// ImageKit server-side upload and media listing API
pub struct ImageKitHost {
    client: reqwest::Client,
    config: ImageKitConfig,
}

impl ImageKitHost {
    pub fn new(client: reqwest::Client, config: ImageKitConfig) -> Self {
        Self { client, config }
    }

    fn hosted(&self, file: ImageKitFile) -> HostedImage {
        let stem = file_stem(&file.name);
        let url = file.url.unwrap_or_else(|| {
            format!(
                "{}/{}/{}",
                self.config.url_endpoint.trim_end_matches('/'),
                IMAGE_HOST_FOLDER,
                file.name
            )
        });
        HostedImage {
            id: stem.clone(),
            url,
            name: stem,
            created_at: file.created_at,
        }
    }
}

#[async_trait]
impl ImageHost for ImageKitHost {
    fn name(&self) -> &'static str {
        "imagekit"
    }

    async fn upload(&self, id: &str, upload: &ImageUpload) -> Result<HostedImage> {
        let file_name = format!("{}.{}", id, upload.extension());
        let form = Form::new()
            .part("file", file_part(upload, file_name.clone())?)
            .text("fileName", file_name)
            .text("folder", format!("/{}", IMAGE_HOST_FOLDER))
            .text("useUniqueFileName", "false");

        let response = self
            .client
            .post("https://upload.imagekit.io/api/v1/files/upload")
            .basic_auth(&self.config.private_key, Some(""))
            .multipart(form)
            .send()
            .await?;
        let file: ImageKitFile = ensure_success(response, self.name())
            .await?
            .json()
            .await?;

        Ok(self.hosted(file))
    }

    async fn list(&self) -> Result<Vec<HostedImage>> {
        let response = self
            .client
            .get("https://api.imagekit.io/v1/files")
            .basic_auth(&self.config.private_key, Some(""))
            .query(&[
                ("path", format!("/{}", IMAGE_HOST_FOLDER)),
                ("limit", "1000".to_string()),
            ])
            .send()
            .await?;
        let files: Vec<ImageKitFile> = ensure_success(response, self.name())
            .await?
            .json()
            .await?;

        Ok(files.into_iter().map(|f| self.hosted(f)).collect())
    }
}
