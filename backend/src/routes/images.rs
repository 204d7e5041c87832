//! Upload and retrieval handlers

use std::sync::Arc;
use std::time::Duration;

use aide::OperationOutput;
use axum::{
    extract::Path,
    http::{header::LOCATION, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use schemars::JsonSchema;
use serde::Serialize;
use tracing::{error, info, instrument};

use crate::{
    image_id::ImageId,
    object_store::{NewObject, ObjectStore},
    types::{AppError, RequestOrigin, UploadedFile},
};

/// Lifetime of every signed download URL
pub const SIGNED_URL_TTL: Duration = Duration::from_secs(60 * 60);

/// Body returned by a successful upload
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// 32-character hex identifier of the stored image
    pub id: ImageId,
    /// Absolute URL that redirects to the image
    pub page_url: String,
}

/// Stores an uploaded image under a fresh random identifier
///
/// The `file` part is buffered in memory (at most 10 MiB) and written to the
/// object store with its declared content type and an `originalname`
/// metadata entry. The identifier is only returned once the write succeeded.
///
/// # Errors
///
/// - `file_required` (400) when the form carries no `file` part
/// - `too_many_files` (400) when it carries more than one
/// - `file_too_large` (413) when the part exceeds the limit
/// - `upload_failed` (500) when the object store write fails
#[instrument(skip_all, fields(size = file.bytes.len(), content_type = %file.content_type))]
pub async fn upload_image(
    Extension(object_store): Extension<Arc<dyn ObjectStore>>,
    origin: RequestOrigin,
    file: UploadedFile,
) -> Result<Json<UploadResponse>, AppError> {
    let id = ImageId::generate();

    object_store
        .put_object(
            id.as_str(),
            NewObject {
                body: file.bytes,
                content_type: file.content_type,
                original_name: file.file_name,
            },
        )
        .await?;

    info!(image_id = %id, "Stored upload");

    let page_url = origin.url_for(&format!("/i/{id}"));
    Ok(Json(UploadResponse { id, page_url }))
}

/// 302 redirect to a signed download URL
#[derive(Debug)]
pub struct SignedRedirect(HeaderValue);

impl IntoResponse for SignedRedirect {
    fn into_response(self) -> Response {
        (StatusCode::FOUND, [(LOCATION, self.0)]).into_response()
    }
}

impl OperationOutput for SignedRedirect {
    type Inner = ();

    fn operation_response(
        _ctx: &mut aide::generate::GenContext,
        _operation: &mut aide::openapi::Operation,
    ) -> Option<aide::openapi::Response> {
        Some(aide::openapi::Response {
            description: "Redirect to a signed download URL valid for one hour".to_string(),
            ..Default::default()
        })
    }
}

/// Plain-text 404 returned for missing images and backend failures alike
#[derive(Debug)]
pub struct ImageNotFound;

impl IntoResponse for ImageNotFound {
    fn into_response(self) -> Response {
        (StatusCode::NOT_FOUND, "Not found").into_response()
    }
}

impl OperationOutput for ImageNotFound {
    type Inner = String;

    fn operation_response(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Option<aide::openapi::Response> {
        String::operation_response(ctx, operation)
    }
}

/// Redirects to a freshly signed download URL for image `id`
///
/// Any string is tried as a key. Every call mints a new URL; nothing is cached.
///
/// # Errors
///
/// Returns `ImageNotFound` (404) when the object does not exist or when the
/// object store fails; the two cases are indistinguishable to the caller.
#[instrument(skip(object_store))]
pub async fn view_image(
    Extension(object_store): Extension<Arc<dyn ObjectStore>>,
    Path(id): Path<String>,
) -> Result<SignedRedirect, ImageNotFound> {
    match object_store.object_exists(&id).await {
        Ok(true) => {}
        Ok(false) => return Err(ImageNotFound),
        Err(e) => {
            error!("Existence check failed for {id}: {e}");
            return Err(ImageNotFound);
        }
    }

    let presigned = object_store
        .presigned_get_url(&id, SIGNED_URL_TTL)
        .await
        .map_err(|e| {
            error!("Failed to sign download URL for {id}: {e}");
            ImageNotFound
        })?;

    let location = HeaderValue::from_str(&presigned.url).map_err(|e| {
        error!("Signed URL for {id} is not a valid header value: {e}");
        ImageNotFound
    })?;

    Ok(SignedRedirect(location))
}
