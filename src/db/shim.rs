//! In-process stand-in for the relational tier.
//!
//! Used whenever no Postgres pool is connected. Queries are recognized by
//! substring matching on the lower-cased statement text and dispatched to
//! array-backed `users` and `gallery` tables. Rows are JSON objects keyed
//! by column name so they deserialize into the same models as real rows.

use serde_json::{Map, Value};
use tokio::sync::RwLock;

pub type Row = Map<String, Value>;

const USER_COLUMNS: [&str; 5] = ["id", "email", "username", "password", "created_at"];

const GALLERY_COLUMNS: [&str; 9] = [
    "id",
    "title",
    "image_url",
    "date_uploaded",
    "downloads",
    "author",
    "tags",
    "chill_level",
    "user_id",
];

/// Statements the shim knows how to answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShimOp {
    InsertUser,
    SelectUserByEmail,
    SelectUserById,
    ListUsers,
    CountUsers,
    DeleteUserById,
    DeleteAllUsers,
    InsertGallery,
    ListGallery,
    SelectGalleryById,
    IncrementDownloads,
    CountGallery,
    DeleteGalleryById,
    DeleteAllGallery,
}

impl ShimOp {
    /// Match a statement against the known query shapes
    ///
    /// More specific patterns are checked before the generic ones they contain.
    pub fn classify(sql: &str) -> Option<Self> {
        let q = sql.to_lowercase();

        let op = if q.contains("insert into users") {
            ShimOp::InsertUser
        } else if q.contains("select * from users where lower(email)") {
            ShimOp::SelectUserByEmail
        } else if q.contains("select * from users where id") {
            ShimOp::SelectUserById
        } else if q.contains("select count(*)") && q.contains("from users") {
            ShimOp::CountUsers
        } else if q.contains("select * from users") {
            ShimOp::ListUsers
        } else if q.contains("delete from users where id") {
            ShimOp::DeleteUserById
        } else if q.contains("delete from users") {
            ShimOp::DeleteAllUsers
        } else if q.contains("insert into gallery") {
            ShimOp::InsertGallery
        } else if q.contains("update gallery set downloads = downloads + 1 where id") {
            ShimOp::IncrementDownloads
        } else if q.contains("select * from gallery where id") {
            ShimOp::SelectGalleryById
        } else if q.contains("select count(*)") && q.contains("from gallery") {
            ShimOp::CountGallery
        } else if q.contains("select * from gallery") {
            ShimOp::ListGallery
        } else if q.contains("delete from gallery where id") {
            ShimOp::DeleteGalleryById
        } else if q.contains("delete from gallery") {
            ShimOp::DeleteAllGallery
        } else {
            return None;
        };

        Some(op)
    }
}

/// Array-backed tables answering the application's literal queries
#[derive(Debug, Default)]
pub struct MemorySql {
    users: RwLock<Vec<Row>>,
    gallery: RwLock<Vec<Row>>,
}

fn param(params: &[Value], index: usize) -> Value {
    params.get(index).cloned().unwrap_or(Value::Null)
}

fn text_param(params: &[Value], index: usize) -> String {
    match params.get(index) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn row_from(columns: &[&str], params: &[Value]) -> Row {
    columns
        .iter()
        .enumerate()
        .map(|(i, column)| (column.to_string(), param(params, i)))
        .collect()
}

fn column_eq(row: &Row, column: &str, value: &str) -> bool {
    row.get(column).and_then(Value::as_str) == Some(value)
}

fn count_row(count: usize) -> Vec<Value> {
    let mut row = Row::new();
    row.insert("count".to_string(), Value::from(count as i64));
    vec![Value::Object(row)]
}

fn remove_where(table: &mut Vec<Row>, id: &str) -> Vec<Value> {
    let mut removed = Vec::new();
    table.retain(|row| {
        if column_eq(row, "id", id) {
            removed.push(Value::Object(row.clone()));
            false
        } else {
            true
        }
    });
    removed
}

impl MemorySql {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one statement, returning the affected or selected rows
    ///
    /// Unrecognized statements return no rows.
    pub async fn query(&self, sql: &str, params: &[Value]) -> Vec<Value> {
        let Some(op) = ShimOp::classify(sql) else {
            tracing::warn!("SQL shim does not understand query, returning no rows: {}", sql);
            return Vec::new();
        };

        tracing::debug!("SQL shim executing {:?}", op);

        match op {
            ShimOp::InsertUser => {
                let row = row_from(&USER_COLUMNS, params);
                let email = text_param(params, 1).to_lowercase();
                let mut users = self.users.write().await;
                let taken = users.iter().any(|u| {
                    u.get("email")
                        .and_then(Value::as_str)
                        .map(|e| e.to_lowercase() == email)
                        .unwrap_or(false)
                });
                if taken {
                    tracing::warn!("SQL shim rejected duplicate email on insert");
                    return Vec::new();
                }
                users.push(row.clone());
                vec![Value::Object(row)]
            }
            ShimOp::SelectUserByEmail => {
                let email = text_param(params, 0).to_lowercase();
                self.users
                    .read()
                    .await
                    .iter()
                    .filter(|u| {
                        u.get("email")
                            .and_then(Value::as_str)
                            .map(|e| e.to_lowercase() == email)
                            .unwrap_or(false)
                    })
                    .map(|u| Value::Object(u.clone()))
                    .collect()
            }
            ShimOp::SelectUserById => {
                let id = text_param(params, 0);
                self.users
                    .read()
                    .await
                    .iter()
                    .filter(|u| column_eq(u, "id", &id))
                    .map(|u| Value::Object(u.clone()))
                    .collect()
            }
            ShimOp::ListUsers => self
                .users
                .read()
                .await
                .iter()
                .rev()
                .map(|u| Value::Object(u.clone()))
                .collect(),
            ShimOp::CountUsers => count_row(self.users.read().await.len()),
            ShimOp::DeleteUserById => {
                let id = text_param(params, 0);
                remove_where(&mut *self.users.write().await, &id)
            }
            ShimOp::DeleteAllUsers => self
                .users
                .write()
                .await
                .drain(..)
                .map(Value::Object)
                .collect(),
            ShimOp::InsertGallery => {
                let row = row_from(&GALLERY_COLUMNS, params);
                self.gallery.write().await.push(row.clone());
                vec![Value::Object(row)]
            }
            ShimOp::ListGallery => self
                .gallery
                .read()
                .await
                .iter()
                .rev()
                .map(|g| Value::Object(g.clone()))
                .collect(),
            ShimOp::SelectGalleryById => {
                let id = text_param(params, 0);
                self.gallery
                    .read()
                    .await
                    .iter()
                    .filter(|g| column_eq(g, "id", &id))
                    .map(|g| Value::Object(g.clone()))
                    .collect()
            }
            ShimOp::IncrementDownloads => {
                let id = text_param(params, 0);
                let mut gallery = self.gallery.write().await;
                gallery
                    .iter_mut()
                    .filter(|g| column_eq(g, "id", &id))
                    .map(|g| {
                        let downloads = g.get("downloads").and_then(Value::as_i64).unwrap_or(0);
                        g.insert("downloads".to_string(), Value::from(downloads + 1));
                        Value::Object(g.clone())
                    })
                    .collect()
            }
            ShimOp::CountGallery => count_row(self.gallery.read().await.len()),
            ShimOp::DeleteGalleryById => {
                let id = text_param(params, 0);
                remove_where(&mut *self.gallery.write().await, &id)
            }
            ShimOp::DeleteAllGallery => self
                .gallery
                .write()
                .await
                .drain(..)
                .map(Value::Object)
                .collect(),
        }
    }
}
