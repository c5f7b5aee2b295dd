use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::User;
use crate::AppState;

// =============================================================================
// Password Hashing
// =============================================================================

/// Hash a password with Argon2id, returning a PHC string
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::PasswordHash(e.to_string()))
}

/// Check a password against a stored PHC string
///
/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let parsed = match PasswordHash::new(stored_hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::error!("Stored password hash is malformed: {}", e);
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

// =============================================================================
// Session Tokens
// =============================================================================

/// Claims carried by a session token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub email: String,
    pub username: String,
    pub iat: usize,
    pub exp: usize,
}

/// Sign an HS256 token for the user, valid for `ttl_hours`
pub fn create_token(secret: &str, user: &User, ttl_hours: i64) -> Result<String> {
    let now = chrono::Utc::now();
    let claims = Claims {
        sub: user.id.clone(),
        email: user.email.clone(),
        username: user.username.clone(),
        iat: now.timestamp() as usize,
        exp: (now + chrono::Duration::hours(ttl_hours)).timestamp() as usize,
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

/// Verify signature and expiry, returning the claims
pub fn verify_token(secret: &str, token: &str) -> Result<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!("Rejected session token: {}", e);
        AppError::Unauthorized
    })
}

/// Authenticated caller, extracted from `Authorization: Bearer <token>`
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::Unauthorized)?;

        let claims = verify_token(&state.config.jwt_secret, token)?;
        Ok(AuthUser(claims))
    }
}

// =============================================================================
// Admin Access
// =============================================================================

/// Compare without short-circuiting on the first differing byte
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Admin endpoints require the configured secret; none configured means no access
pub fn verify_admin_key(configured: Option<&str>, provided: Option<&str>) -> Result<()> {
    let configured = configured.ok_or(AppError::Unauthorized)?;
    let provided = provided.ok_or(AppError::Unauthorized)?;

    if !constant_time_eq(configured.as_bytes(), provided.as_bytes()) {
        tracing::warn!("Invalid admin key attempt");
        return Err(AppError::Unauthorized);
    }
    Ok(())
}
