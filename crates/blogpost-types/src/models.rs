use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Public view of an account. Password hash and session token never leave the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub image_filename: Option<String>,
    /// Where the attached image is served from, if any.
    pub image_url: Option<String>,
    pub owner_id: i64,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
