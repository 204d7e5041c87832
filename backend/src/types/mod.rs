mod config;
mod environment;
mod error;
mod extractors;

pub use config::{AppConfig, ConfigError, StorageConfig};
pub use environment::Environment;
pub use error::{ApiErrorResponse, AppError, UploadError};
pub use extractors::{
    RequestOrigin, UploadedFile, DEFAULT_CONTENT_TYPE, FILE_FIELD, MAX_FORM_FIELD_BYTES,
    MAX_UPLOAD_BYTES,
};
