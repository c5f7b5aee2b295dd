use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::ERR_LOGIN_FIELDS_REQUIRED;
use crate::error::{AppError, Result};
use crate::models::{User, UserRecord};
use crate::routes::validation::validate_signup;
use crate::security::{create_token, hash_password, verify_password, AuthUser};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub user: User,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: String,
    pub email: String,
    pub username: String,
}

/// Create an account
///
/// Emails are unique regardless of case and stored lower-cased.
/// Returns 409 Conflict if the email is taken, 400 with itemized
/// `details` when any field fails validation.
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>)> {
    let email = payload.email.trim().to_lowercase();
    let username = payload.username.trim().to_string();
    let password = payload.password;

    validate_signup(&email, &username, &password)?;

    if state.db.find_user_by_email(&email).await?.is_some() {
        tracing::warn!("Signup attempt with an existing email");
        return Err(AppError::UserAlreadyExists);
    }

    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password)).await??;

    let record = UserRecord {
        id: Uuid::new_v4().to_string(),
        email,
        username,
        password: password_hash,
        created_at: Utc::now(),
    };
    let stored = state.db.insert_user(&record).await?;

    tracing::info!("New user registered: {}", stored.id);

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            user: stored.into(),
            message: "User created successfully".to_string(),
        }),
    ))
}

/// Exchange credentials for a session token
///
/// Unknown email and wrong password produce the same 401.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || payload.password.is_empty() {
        return Err(AppError::InvalidInput(ERR_LOGIN_FIELDS_REQUIRED.to_string()));
    }

    let Some(record) = state.db.find_user_by_email(&email).await? else {
        tracing::warn!("Login attempt for unknown email");
        return Err(AppError::InvalidCredentials);
    };

    let stored_hash = record.password.clone();
    let password = payload.password;
    let valid =
        tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash)).await?;
    if !valid {
        tracing::warn!("Login attempt with wrong password for user {}", record.id);
        return Err(AppError::InvalidCredentials);
    }

    let user = User::from(record);
    let token = create_token(&state.config.jwt_secret, &user, state.config.token_ttl_hours)?;

    tracing::info!("User logged in: {}", user.id);

    Ok(Json(LoginResponse { user, token }))
}

/// Identity carried by the caller's token
pub async fn me(AuthUser(claims): AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        id: claims.sub,
        email: claims.email,
        username: claims.username,
    })
}
