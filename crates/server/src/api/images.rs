use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use tracing::info;

use imagecast_core::{Image, ImageContentType, ImageUpload};
use imagecast_pipeline::DownloadedImage;

use super::AppState;
use crate::error::ServerError;

const OCTET_STREAM: &str = "application/octet-stream";

/// Response content type for a stored image, derived from its extension.
pub fn content_type_for(extension: &str) -> &'static str {
    ImageContentType::from_extension(extension).map_or(OCTET_STREAM, ImageContentType::as_mime)
}

fn image_bytes(downloaded: DownloadedImage) -> Response {
    let content_type = content_type_for(&downloaded.image.image_extension);
    ([(header::CONTENT_TYPE, content_type)], downloaded.content).into_response()
}

/// `GET /api/v1/image` -- every catalog record.
pub async fn list_images(State(state): State<AppState>) -> Result<Json<Vec<Image>>, ServerError> {
    info!("list images request");
    Ok(Json(state.ingestion.list().await?))
}

/// `GET /api/v1/image/{name}` -- the stored bytes of one image.
pub async fn download_image(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, ServerError> {
    info!(file_name = %name, "download image request");
    Ok(image_bytes(state.ingestion.download(&name).await?))
}

/// `GET /api/v1/image/random` -- the bytes of a uniformly chosen image.
pub async fn random_image(State(state): State<AppState>) -> Result<Response, ServerError> {
    info!("random image request");
    Ok(image_bytes(state.ingestion.random_one().await?))
}

/// `POST /api/v1/image` -- multipart upload.
///
/// Expects a `file` part carrying the file name and content type, and an
/// optional `description` text part. Unknown parts are ignored.
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Image>, ServerError> {
    let mut file: Option<ImageUpload> = None;
    let mut description: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_owned();
        match field_name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_owned();
                let content_type = field.content_type().unwrap_or_default().to_owned();
                let content = field.bytes().await?;
                file = Some(ImageUpload::new(file_name, content_type, content));
            }
            "description" => {
                description = Some(field.text().await?);
            }
            _ => {}
        }
    }

    let mut upload =
        file.ok_or_else(|| ServerError::BadRequest("missing multipart field `file`".into()))?;
    upload.description = description;

    info!(file_name = %upload.file_name, "upload image request");
    Ok(Json(state.ingestion.upload(upload).await?))
}

/// `DELETE /api/v1/image/{name}` -- remove the blob and the catalog record.
pub async fn delete_image(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<String, ServerError> {
    info!(file_name = %name, "delete image request");
    let deleted = state.ingestion.delete(&name).await?;
    Ok(format!(
        "Image '{name}' was successfully deleted. Deleted: {deleted}"
    ))
}
