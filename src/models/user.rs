use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{
    ERR_PASSWORD_NO_DIGIT, ERR_PASSWORD_NO_LOWERCASE, ERR_PASSWORD_NO_UPPERCASE,
    ERR_PASSWORD_TOO_SHORT, MAX_USERNAME_LENGTH, MIN_PASSWORD_LENGTH, MIN_USERNAME_LENGTH,
};

/// User row as stored in the relational tier (or the SQL shim)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRecord {
    pub id: String,
    /// Always stored lower-cased
    pub email: String,
    pub username: String,
    /// Argon2 PHC string
    pub password: String,
    pub created_at: DateTime<Utc>,
}

/// User model for API responses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            email: record.email,
            username: record.username,
            created_at: record.created_at,
        }
    }
}

impl User {
    /// Loose `local@domain.tld` shape check
    pub fn validate_email(email: &str) -> bool {
        let Some((local, domain)) = email.split_once('@') else {
            return false;
        };
        !local.is_empty()
            && !domain.contains('@')
            && !email.chars().any(char::is_whitespace)
            && domain
                .split_once('.')
                .map(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
                .unwrap_or(false)
    }

    pub fn validate_username(username: &str) -> bool {
        let len = username.chars().count();
        (MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&len)
    }

    /// Every password rule the candidate breaks, in a stable order
    pub fn password_violations(password: &str) -> Vec<String> {
        let mut violations = Vec::new();

        if password.chars().count() < MIN_PASSWORD_LENGTH {
            violations.push(ERR_PASSWORD_TOO_SHORT.to_string());
        }
        if !password.chars().any(|c| c.is_uppercase()) {
            violations.push(ERR_PASSWORD_NO_UPPERCASE.to_string());
        }
        if !password.chars().any(|c| c.is_lowercase()) {
            violations.push(ERR_PASSWORD_NO_LOWERCASE.to_string());
        }
        if !password.chars().any(|c| c.is_ascii_digit()) {
            violations.push(ERR_PASSWORD_NO_DIGIT.to_string());
        }

        violations
    }
}
