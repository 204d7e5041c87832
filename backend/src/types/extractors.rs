//! Custom extractors for upload forms and request origin

use std::sync::Arc;

use aide::OperationIo;
use axum::{
    extract::{
        multipart::{Field, MultipartError},
        FromRequest, FromRequestParts, Multipart, Request,
    },
    http::{header::HOST, request::Parts, HeaderMap, StatusCode},
};
use bytes::{Bytes, BytesMut};
use tracing::{debug, warn};

use super::{AppConfig, AppError, UploadError};

/// Multipart field carrying the upload
pub const FILE_FIELD: &str = "file";

/// Upload limit for the `file` part (10 MiB)
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Combined limit for all non-file form fields (1 MiB)
pub const MAX_FORM_FIELD_BYTES: usize = 1024 * 1024;

/// Content type recorded when the part declares none
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

const FORWARDED_HOST: &str = "x-forwarded-host";
const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// The `file` part of a `multipart/form-data` upload, fully buffered
#[derive(Debug, OperationIo)]
pub struct UploadedFile {
    /// Raw file bytes
    pub bytes: Bytes,
    /// Content type declared by the client
    pub content_type: String,
    /// Filename declared by the client, possibly empty
    pub file_name: String,
}

impl<S> FromRequest<S> for UploadedFile
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(req, state).await.map_err(|err| {
            debug!("Request is not a readable multipart form: {err}");
            UploadError::FileRequired
        })?;

        let mut upload = None;
        let mut form_field_bytes = 0;
        // Form fields are capped while drained, so a body overflow here means an oversized file
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|err| map_multipart_error(&err, UploadError::FileTooLarge))?
        {
            // Only parts carrying a filename are files; anything else is a plain form field
            if field.name() != Some(FILE_FIELD) || field.file_name().is_none() {
                form_field_bytes = drain_form_field(field, form_field_bytes).await?;
                continue;
            }
            if upload.is_some() {
                return Err(UploadError::TooManyFiles.into());
            }
            upload = Some(read_file(field).await?);
        }

        upload.ok_or_else(|| UploadError::FileRequired.into())
    }
}

async fn read_file(mut field: Field<'_>) -> Result<UploadedFile, AppError> {
    let content_type = field
        .content_type()
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string();
    let file_name = field.file_name().unwrap_or_default().to_string();

    let mut buf = BytesMut::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|err| map_multipart_error(&err, UploadError::FileTooLarge))?
    {
        if buf.len() + chunk.len() > MAX_UPLOAD_BYTES {
            return Err(UploadError::FileTooLarge.into());
        }
        buf.extend_from_slice(&chunk);
    }

    Ok(UploadedFile {
        bytes: buf.freeze(),
        content_type,
        file_name,
    })
}

/// Reads and discards a non-file part, returning the running total of form field bytes
async fn drain_form_field(mut field: Field<'_>, mut total: usize) -> Result<usize, AppError> {
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|err| map_multipart_error(&err, UploadError::FormTooLarge))?
    {
        total += chunk.len();
        if total > MAX_FORM_FIELD_BYTES {
            return Err(UploadError::FormTooLarge.into());
        }
    }
    Ok(total)
}

/// `too_large` names the part that was being read when the body limit tripped
fn map_multipart_error(err: &MultipartError, too_large: UploadError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large.into()
    } else {
        warn!("Malformed multipart body: {}", err.body_text());
        UploadError::FileRequired.into()
    }
}

/// Scheme and host the client used to reach this server
///
/// Behind a reverse proxy the forwarded headers win, unless
/// `trust_proxy_headers` is turned off in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, OperationIo)]
pub struct RequestOrigin {
    /// `http` or `https`
    pub scheme: String,
    /// Host, with port when non-default
    pub host: String,
}

impl RequestOrigin {
    /// Resolves the origin from request headers and URI
    #[must_use]
    pub fn from_parts(parts: &Parts, trust_proxy_headers: bool) -> Self {
        let forwarded = |name| {
            trust_proxy_headers
                .then(|| first_header_value(&parts.headers, name))
                .flatten()
        };

        let host = forwarded(FORWARDED_HOST)
            .or_else(|| first_header_value(&parts.headers, HOST.as_str()))
            .or_else(|| parts.uri.authority().map(ToString::to_string))
            .unwrap_or_else(|| "localhost".to_string());

        let scheme = forwarded(FORWARDED_PROTO)
            .map(|proto| proto.to_ascii_lowercase())
            .filter(|proto| proto == "http" || proto == "https")
            .or_else(|| parts.uri.scheme_str().map(ToString::to_string))
            .unwrap_or_else(|| "http".to_string());

        Self { scheme, host }
    }

    /// `scheme://host` without a trailing slash
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }

    /// Absolute URL for `path`, which must start with `/`
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{path}", self.base_url())
    }
}

fn first_header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

impl<S> FromRequestParts<S> for RequestOrigin
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let trust_proxy_headers = parts
            .extensions
            .get::<Arc<AppConfig>>()
            .is_none_or(|config| config.trust_proxy_headers);

        Ok(Self::from_parts(parts, trust_proxy_headers))
    }
}
