use chrono::Utc;
use tracing::info;

use blogpost_db::{Database, NewPost, PostChanges, PostRow};

use crate::AppStateInner;
use crate::error::ApiError;
use crate::forms::{PostForm, Upload};

/// Create a post owned by `owner_id`, storing the attached image first.
///
/// If the record cannot be written the stored image is released again.
pub async fn create(
    state: &AppStateInner,
    owner_id: i64,
    title: &str,
    body: &str,
    image: Option<Upload>,
) -> Result<PostRow, ApiError> {
    let title = required_text("Title", title)?;
    let body = required_text("Body", body)?;
    check_uploads_allowed(state, image.as_ref())?;

    let image_filename = match &image {
        Some(upload) => Some(state.storage.store(&upload.filename, &upload.bytes).await?),
        None => None,
    };

    let result = state.db.create_post(&NewPost {
        owner_id,
        title,
        body,
        image_filename: image_filename.as_deref(),
        created_at: Utc::now(),
    });

    match result {
        Ok(post) => {
            info!("Account {} created post {}", owner_id, post.id);
            Ok(post)
        }
        Err(e) => {
            state.storage.release(image_filename.as_deref()).await;
            Err(e.into())
        }
    }
}

/// Create from a submitted form; title and body are mandatory.
pub async fn create_from_form(
    state: &AppStateInner,
    owner_id: i64,
    form: PostForm,
) -> Result<PostRow, ApiError> {
    let title = form.title.unwrap_or_default();
    let body = form.body.unwrap_or_default();
    create(state, owner_id, &title, &body, form.file).await
}

pub fn list(db: &Database) -> Result<Vec<PostRow>, ApiError> {
    Ok(db.list_posts()?)
}

pub fn list_by_owner(db: &Database, owner_id: i64) -> Result<Vec<PostRow>, ApiError> {
    Ok(db.list_posts_by_owner(owner_id)?)
}

pub fn get(db: &Database, id: i64) -> Result<PostRow, ApiError> {
    db.get_post(id)?.ok_or(ApiError::NotFound("Post"))
}

/// Apply the supplied fields of `form` to `current`. The caller must already
/// have passed the authorization gate.
///
/// A new file replaces the current image; `remove_image` alone clears it.
/// If the record update fails, a newly stored image is released.
pub async fn update(
    state: &AppStateInner,
    current: &PostRow,
    form: PostForm,
) -> Result<PostRow, ApiError> {
    let title = form
        .title
        .as_deref()
        .map(|t| required_text("Title", t).map(str::to_string))
        .transpose()?;
    let body = form
        .body
        .as_deref()
        .map(|b| required_text("Body", b).map(str::to_string))
        .transpose()?;
    check_uploads_allowed(state, form.file.as_ref())?;

    let old_image = current.image_filename.as_deref();
    let mut new_image = None;
    let image_filename = match (&form.file, form.remove_image) {
        (Some(upload), _) => {
            let reference = state
                .storage
                .replace(old_image, &upload.filename, &upload.bytes)
                .await?;
            new_image = Some(reference.clone());
            Some(Some(reference))
        }
        (None, true) => {
            state.storage.release(old_image).await;
            Some(None)
        }
        (None, false) => None,
    };

    let changes = PostChanges {
        title,
        body,
        image_filename,
        updated_at: Utc::now(),
    };

    match state.db.update_post(current.id, &changes) {
        Ok(Some(post)) => {
            info!("Updated post {}", post.id);
            Ok(post)
        }
        Ok(None) => {
            state.storage.release(new_image.as_deref()).await;
            Err(ApiError::NotFound("Post"))
        }
        Err(e) => {
            state.storage.release(new_image.as_deref()).await;
            Err(e.into())
        }
    }
}

/// Release the post's image, then remove the record.
pub async fn delete(state: &AppStateInner, post: &PostRow) -> Result<(), ApiError> {
    state.storage.release(post.image_filename.as_deref()).await;

    if !state.db.delete_post(post.id)? {
        return Err(ApiError::NotFound("Post"));
    }
    info!("Deleted post {}", post.id);
    Ok(())
}

fn required_text<'a>(field: &str, value: &'a str) -> Result<&'a str, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(format!("{} must not be empty", field)));
    }
    Ok(trimmed)
}

fn check_uploads_allowed(state: &AppStateInner, file: Option<&Upload>) -> Result<(), ApiError> {
    if file.is_some() && !state.features.uploads_enabled {
        return Err(ApiError::validation("Image uploads are disabled"));
    }
    Ok(())
}
