//! Database row types. These map directly to SQLite rows and stay
//! independent of the public API models in blogpost-types.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct AccountRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub session_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRow {
    pub id: i64,
    pub owner_id: i64,
    /// Owner's username, joined in by every post query.
    pub author: String,
    pub title: String,
    pub body: String,
    pub image_filename: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct NewPost<'a> {
    pub owner_id: i64,
    pub title: &'a str,
    pub body: &'a str,
    pub image_filename: Option<&'a str>,
    pub created_at: DateTime<Utc>,
}

/// Partial update. `None` leaves the column untouched; for the image,
/// `Some(None)` clears the reference.
#[derive(Debug)]
pub struct PostChanges {
    pub title: Option<String>,
    pub body: Option<String>,
    pub image_filename: Option<Option<String>>,
    pub updated_at: DateTime<Utc>,
}
