//! Universal error handling for the API

use aide::OperationOutput;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use schemars::JsonSchema;
use serde::Serialize;
use thiserror::Error;

use crate::object_store::StoreError;

/// API error response body: `{"error": "<code>"}`
#[derive(Debug, Serialize, JsonSchema)]
pub struct ApiErrorResponse {
    /// Machine-readable error code
    pub error: &'static str,
}

/// Application error carrying an HTTP status and a machine-readable code
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    inner: ApiErrorResponse,
}

impl AppError {
    /// Create a new application error
    #[must_use]
    pub const fn new(status: StatusCode, code: &'static str) -> Self {
        Self {
            status,
            inner: ApiErrorResponse { error: code },
        }
    }

    /// HTTP status this error maps to
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.inner.error
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self.status.as_u16() {
            400..=499 => tracing::warn!("Client error: {}", self.inner.error),
            500..=599 => tracing::error!("Server error: {}", self.inner.error),
            _ => {}
        }

        (self.status, Json(self.inner)).into_response()
    }
}

/// Reasons an upload is refused
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadError {
    /// The form carried no `file` part
    #[error("file is required")]
    FileRequired,

    /// The form carried more than one `file` part
    #[error("only one file may be uploaded per request")]
    TooManyFiles,

    /// The `file` part exceeded the upload limit
    #[error("file exceeds the upload size limit")]
    FileTooLarge,

    /// The non-file form fields together exceeded their limit
    #[error("form fields exceed the size limit")]
    FormTooLarge,

    /// The object store rejected or failed the write
    #[error("upload failed")]
    StorageFailure,
}

impl UploadError {
    /// HTTP status for this error
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::FileRequired | Self::TooManyFiles => StatusCode::BAD_REQUEST,
            Self::FileTooLarge | Self::FormTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::StorageFailure => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Wire code for this error
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::FileRequired => "file_required",
            Self::TooManyFiles => "too_many_files",
            Self::FileTooLarge => "file_too_large",
            Self::FormTooLarge => "form_too_large",
            Self::StorageFailure => "upload_failed",
        }
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        Self::new(err.status(), err.code())
    }
}

/// Backend failures never reach the client beyond a generic code
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        tracing::error!("Object store error: {err}");
        UploadError::StorageFailure.into()
    }
}

impl OperationOutput for AppError {
    type Inner = ApiErrorResponse;

    fn operation_response(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Option<aide::openapi::Response> {
        Json::<ApiErrorResponse>::operation_response(ctx, operation)
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;

    #[test]
    fn upload_errors_map_to_status_and_code() {
        let cases = [
            (UploadError::FileRequired, 400, "file_required"),
            (UploadError::TooManyFiles, 400, "too_many_files"),
            (UploadError::FileTooLarge, 413, "file_too_large"),
            (UploadError::FormTooLarge, 413, "form_too_large"),
            (UploadError::StorageFailure, 500, "upload_failed"),
        ];

        for (err, status, code) in cases {
            let app_error = AppError::from(err);
            assert_eq!(app_error.status().as_u16(), status);
            assert_eq!(app_error.code(), code);
        }
    }

    #[test]
    fn store_errors_become_generic_upload_failure() {
        let err = AppError::from(StoreError::UpstreamError("503 SlowDown".to_string()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "upload_failed");
    }

    #[tokio::test]
    async fn response_body_has_error_field_only() {
        let response = AppError::from(UploadError::FileRequired).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "file_required" }));
    }
}
