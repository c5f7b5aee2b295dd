use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("Document store error: {0}")]
    DocumentStore(#[from] redb::Error),

    #[error("Document store open error: {0}")]
    DocumentStoreOpen(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::error::EncodeError),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] bincode::error::DecodeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Image host error: {0}")]
    ImageHost(String),

    #[error("Malformed upload: {0}")]
    Multipart(MultipartError),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("User already exists")]
    UserAlreadyExists,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        details: Vec<String>,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Payload too large")]
    PayloadTooLarge,
}

impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        // Body-limit rejections arrive as multipart stream errors
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge
        } else {
            AppError::Multipart(e)
        }
    }
}

impl AppError {
    /// Validation error carrying an itemized list of rule violations
    pub fn validation(message: impl Into<String>, details: Vec<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            details,
        }
    }
}

/// Implement IntoResponse to convert AppError into HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, details) = match self {
            AppError::Sql(_)
            | AppError::DocumentStore(_)
            | AppError::DocumentStoreOpen(_)
            | AppError::Transaction(_)
            | AppError::Table(_)
            | AppError::Storage(_)
            | AppError::Commit(_)
            | AppError::Serialization(_)
            | AppError::Deserialization(_)
            | AppError::Json(_)
            | AppError::Io(_)
            | AppError::Http(_)
            | AppError::TaskJoin(_)
            | AppError::Token(_)
            | AppError::PasswordHash(_)
            | AppError::ImageHost(_) => {
                tracing::error!("Internal error: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
            AppError::StorageUnavailable(ref msg) => {
                tracing::error!("Storage unavailable: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone(), None)
            }
            AppError::Multipart(ref e) => {
                (e.status(), format!("Malformed upload: {}", e.body_text()), None)
            }
            AppError::UserAlreadyExists => (
                StatusCode::CONFLICT,
                "User with this email already exists".to_string(),
                None,
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                crate::constants::ERR_INVALID_CREDENTIALS.to_string(),
                None,
            ),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string(), None),
            AppError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{} not found", what), None),
            AppError::Validation {
                ref message,
                ref details,
            } => (StatusCode::BAD_REQUEST, message.clone(), Some(details.clone())),
            AppError::InvalidInput(ref msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            AppError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "Upload size exceeds maximum allowed".to_string(),
                None,
            ),
        };

        let body = match details {
            Some(details) => Json(json!({
                "error": error_message,
                "details": details,
            })),
            None => Json(json!({
                "error": error_message
            })),
        };

        (status, body).into_response()
    }
}

/// Result type alias for application results
pub type Result<T> = std::result::Result<T, AppError>;
