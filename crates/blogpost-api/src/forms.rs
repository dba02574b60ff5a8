use axum::{
    Json,
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
};
use tracing::debug;

use blogpost_types::api::EditPostRequest;

use crate::error::ApiError;

/// A file part from a multipart body.
pub struct Upload {
    pub filename: String,
    pub bytes: Bytes,
}

/// Fields of a post submission or edit, in whichever encoding the client used.
#[derive(Default)]
pub struct PostForm {
    pub title: Option<String>,
    pub body: Option<String>,
    pub file: Option<Upload>,
    pub remove_image: bool,
}

impl PostForm {
    /// Read `title`, `body`, `file` (or `image`) and `remove_image` parts.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "title" => form.title = Some(field.text().await?),
                "body" => form.body = Some(field.text().await?),
                "remove_image" => form.remove_image = parse_flag(&field.text().await?),
                "file" | "image" => {
                    let filename = field.file_name().unwrap_or_default().to_string();
                    let bytes = field.bytes().await?;
                    // An untouched <input type="file"> still sends an empty part.
                    if filename.is_empty() && bytes.is_empty() {
                        continue;
                    }
                    form.file = Some(Upload { filename, bytes });
                }
                other => debug!("Ignoring multipart field {:?}", other),
            }
        }

        Ok(form)
    }
}

impl From<EditPostRequest> for PostForm {
    fn from(req: EditPostRequest) -> Self {
        let remove_image = req.clears_image();
        Self {
            title: req.title,
            body: req.body,
            file: None,
            remove_image,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "on" | "yes"
    )
}

/// Edit body: multipart when the client sends a file, JSON otherwise.
pub struct EditForm(pub PostForm);

impl<S> FromRequest<S> for EditForm
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state).await?;
            Ok(Self(PostForm::from_multipart(multipart).await?))
        } else {
            let Json(body) = Json::<EditPostRequest>::from_request(req, state).await?;
            Ok(Self(body.into()))
        }
    }
}
