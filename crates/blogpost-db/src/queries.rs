use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::models::{AccountRow, NewPost, PostChanges, PostRow};
use crate::{Database, Result};

const ACCOUNT_COLUMNS: &str =
    "SELECT id, username, email, password_hash, session_token, created_at FROM accounts";

// LEFT JOIN keeps a post listable even if its author row is somehow missing.
const POST_COLUMNS: &str = "SELECT p.id, p.owner_id, COALESCE(a.username, ''), p.title, p.body,
            p.image_filename, p.created_at, p.updated_at
     FROM posts p
     LEFT JOIN accounts a ON a.id = p.owner_id";

impl Database {
    // -- Accounts --

    pub fn create_account(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<AccountRow> {
        self.with_conn(|conn| insert_account(conn, username, email, password_hash))
    }

    pub fn get_account_by_id(&self, id: i64) -> Result<Option<AccountRow>> {
        self.with_conn(|conn| query_account(conn, "id", &id))
    }

    pub fn get_account_by_username(&self, username: &str) -> Result<Option<AccountRow>> {
        self.with_conn(|conn| query_account(conn, "username", &username))
    }

    pub fn get_account_by_email(&self, email: &str) -> Result<Option<AccountRow>> {
        self.with_conn(|conn| query_account(conn, "email", &email))
    }

    pub fn get_account_by_session_token(&self, token: &str) -> Result<Option<AccountRow>> {
        self.with_conn(|conn| query_account(conn, "session_token", &token))
    }

    /// Overwrite (or clear, with `None`) the account's session token.
    /// Returns false if the account does not exist.
    pub fn set_session_token(&self, account_id: i64, token: Option<&str>) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE accounts SET session_token = ?1 WHERE id = ?2",
                params![token, account_id],
            )?;
            Ok(changed == 1)
        })
    }

    /// Clear whichever account currently holds `token`. Returns whether one did.
    pub fn clear_session_token(&self, token: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE accounts SET session_token = NULL WHERE session_token = ?1",
                [token],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Posts --

    pub fn create_post(&self, post: &NewPost<'_>) -> Result<PostRow> {
        self.with_conn(|conn| insert_post(conn, post))
    }

    pub fn get_post(&self, id: i64) -> Result<Option<PostRow>> {
        self.with_conn(|conn| query_post(conn, id))
    }

    /// All posts, newest first.
    pub fn list_posts(&self) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!("{POST_COLUMNS} ORDER BY p.created_at DESC, p.id DESC");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], post_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// One owner's posts, newest first.
    pub fn list_posts_by_owner(&self, owner_id: i64) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{POST_COLUMNS} WHERE p.owner_id = ?1 ORDER BY p.created_at DESC, p.id DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([owner_id], post_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_post(&self, id: i64, changes: &PostChanges) -> Result<Option<PostRow>> {
        self.transaction(|tx| update_post(tx, id, changes))
    }

    pub fn delete_post(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| delete_post(conn, id))
    }
}

// Free functions take a bare connection so callers can compose them inside
// `Database::transaction`.

pub fn insert_account(
    conn: &Connection,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<AccountRow> {
    let created_at = Utc::now();
    conn.execute(
        "INSERT INTO accounts (username, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![username, email, password_hash, created_at],
    )?;

    Ok(AccountRow {
        id: conn.last_insert_rowid(),
        username: username.to_string(),
        email: email.to_string(),
        password_hash: password_hash.to_string(),
        session_token: None,
        created_at,
    })
}

fn query_account(
    conn: &Connection,
    column: &str,
    value: &dyn rusqlite::ToSql,
) -> Result<Option<AccountRow>> {
    // `column` is always one of the literals above, never user input.
    let sql = format!("{ACCOUNT_COLUMNS} WHERE {column} = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([value], account_from_row).optional()?;
    Ok(row)
}

pub fn insert_post(conn: &Connection, post: &NewPost<'_>) -> Result<PostRow> {
    conn.execute(
        "INSERT INTO posts (owner_id, title, body, image_filename, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![
            post.owner_id,
            post.title,
            post.body,
            post.image_filename,
            post.created_at
        ],
    )?;

    let id = conn.last_insert_rowid();
    query_post(conn, id)?.ok_or(crate::DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
}

pub fn query_post(conn: &Connection, id: i64) -> Result<Option<PostRow>> {
    let sql = format!("{POST_COLUMNS} WHERE p.id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([id], post_from_row).optional()?;
    Ok(row)
}

/// Apply `changes` and return the updated row, or `None` if `id` does not exist.
pub fn update_post(conn: &Connection, id: i64, changes: &PostChanges) -> Result<Option<PostRow>> {
    let (set_image, image) = match &changes.image_filename {
        Some(image) => (true, image.as_deref()),
        None => (false, None),
    };

    let changed = conn.execute(
        "UPDATE posts SET
            title = COALESCE(?2, title),
            body = COALESCE(?3, body),
            image_filename = CASE WHEN ?4 THEN ?5 ELSE image_filename END,
            updated_at = ?6
         WHERE id = ?1",
        params![
            id,
            changes.title,
            changes.body,
            set_image,
            image,
            changes.updated_at
        ],
    )?;

    if changed == 0 {
        return Ok(None);
    }
    query_post(conn, id)
}

pub fn delete_post(conn: &Connection, id: i64) -> Result<bool> {
    let changed = conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
    Ok(changed == 1)
}

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<AccountRow> {
    Ok(AccountRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        session_token: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        author: row.get(2)?,
        title: row.get(3)?,
        body: row.get(4)?,
        image_filename: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}
