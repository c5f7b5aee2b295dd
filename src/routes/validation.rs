use bytes::Bytes;

use crate::constants::{
    DEFAULT_CHILL_LEVEL, ERR_SIGNUP_FIELDS_REQUIRED, MAX_TITLE_LENGTH, MAX_USERNAME_LENGTH,
    MIN_USERNAME_LENGTH,
};
use crate::error::AppError;
use crate::models::{GalleryItem, ImageUpload, User};
use crate::security::Claims;

/// Check signup fields, reporting every problem at once
///
/// `email` is expected to be trimmed and lower-cased already.
pub fn validate_signup(email: &str, username: &str, password: &str) -> Result<(), AppError> {
    if email.is_empty() || username.is_empty() || password.is_empty() {
        return Err(AppError::InvalidInput(ERR_SIGNUP_FIELDS_REQUIRED.to_string()));
    }

    let mut details = Vec::new();
    if !User::validate_email(email) {
        details.push("Email address is not valid".to_string());
    }
    if !User::validate_username(username) {
        details.push(format!(
            "Username must be between {} and {} characters",
            MIN_USERNAME_LENGTH, MAX_USERNAME_LENGTH
        ));
    }
    details.extend(User::password_violations(password));

    if details.is_empty() {
        Ok(())
    } else {
        Err(AppError::validation("Validation failed", details))
    }
}

/// The uploaded file part of a gallery form
#[derive(Debug)]
pub struct UploadedFile {
    pub bytes: Bytes,
    pub file_name: String,
    pub content_type: String,
}

/// Raw fields collected from a multipart gallery upload
#[derive(Debug, Default)]
pub struct UploadForm {
    pub title: Option<String>,
    pub tags: Option<String>,
    pub chill_level: Option<String>,
    pub file: Option<UploadedFile>,
}

impl UploadForm {
    /// Validate the form and attach the caller's identity
    ///
    /// A missing chill level defaults to the middle of the scale.
    pub fn into_upload(self, claims: &Claims) -> Result<ImageUpload, AppError> {
        let mut details = Vec::new();

        let title = self.title.unwrap_or_default().trim().to_string();
        if title.is_empty() {
            details.push("Title is required".to_string());
        } else if !GalleryItem::validate_title(&title) {
            details.push(format!("Title must be at most {} characters", MAX_TITLE_LENGTH));
        }

        let chill_level = match self.chill_level.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_CHILL_LEVEL,
            Some(raw) => match raw.parse::<i32>() {
                Ok(level) if GalleryItem::validate_chill_level(level) => level,
                _ => {
                    details.push("Chill level must be an integer between 1 and 5".to_string());
                    DEFAULT_CHILL_LEVEL
                }
            },
        };

        let tags = self
            .tags
            .as_deref()
            .map(GalleryItem::parse_tags)
            .unwrap_or_default();

        match &self.file {
            None => details.push("Image file is required".to_string()),
            Some(file) if file.bytes.is_empty() => details.push("Image file is empty".to_string()),
            Some(file) if !file.content_type.starts_with("image/") => {
                details.push("Only image files are allowed".to_string())
            }
            Some(_) => {}
        }

        if !details.is_empty() {
            return Err(AppError::validation("Invalid upload", details));
        }

        let file = self
            .file
            .ok_or_else(|| AppError::InvalidInput("Image file is required".to_string()))?;

        Ok(ImageUpload {
            bytes: file.bytes,
            file_name: file.file_name,
            content_type: file.content_type,
            title,
            tags,
            chill_level,
            author: claims.username.clone(),
            user_id: claims.sub.clone(),
        })
    }
}
