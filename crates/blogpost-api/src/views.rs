//! Row -> public model conversions.

use blogpost_db::{AccountRow, PostRow};
use blogpost_types::models::{Account, Post};

use crate::UPLOADS_ROUTE;

pub fn account(row: &AccountRow) -> Account {
    Account {
        id: row.id,
        username: row.username.clone(),
        email: row.email.clone(),
        created_at: row.created_at,
    }
}

pub fn post(row: PostRow) -> Post {
    let image_url = row
        .image_filename
        .as_ref()
        .map(|name| format!("{}/{}", UPLOADS_ROUTE, name));

    Post {
        id: row.id,
        title: row.title,
        body: row.body,
        image_filename: row.image_filename,
        image_url,
        owner_id: row.owner_id,
        author: row.author,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

pub fn posts(rows: Vec<PostRow>) -> Vec<Post> {
    rows.into_iter().map(post).collect()
}
