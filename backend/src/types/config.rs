//! Process-wide configuration, read once at startup

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use aws_config::{retry::RetryConfig, timeout::TimeoutConfig, BehaviorVersion};
use aws_sdk_s3::config::{Credentials, Region};
use thiserror::Error;

use super::Environment;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_REGION: &str = "auto";
const DEFAULT_STATIC_DIR: &str = "public";
const S3_OPERATION_TIMEOUT_SECS: u64 = 30;

const LOCAL_ENDPOINT: &str = "http://localhost:4566";
const LOCAL_BUCKET: &str = "image-host";
const LOCAL_ACCESS_KEY: &str = "test";

/// Errors that prevent the server from starting
#[derive(Error, Debug)]
pub enum ConfigError {
    /// `APP_ENV` holds an unknown stage
    #[error("Invalid environment: {0}")]
    InvalidEnvironment(String),

    /// A required variable is unset or empty
    #[error("{0} environment variable is not set")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed
    #[error("Invalid value for {name}: {value}")]
    Invalid {
        /// Variable name
        name: &'static str,
        /// Offending value
        value: String,
    },
}

/// Connection settings for the S3-compatible backend
#[derive(Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Bucket receiving uploads
    pub bucket: String,
    /// S3 API endpoint, e.g. an R2 account URL
    pub endpoint: String,
    /// Access key id
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Signing region
    pub region: String,
    /// Address buckets by path instead of virtual host
    pub force_path_style: bool,
    /// Total attempts per backend call; 1 disables retries
    pub max_attempts: u32,
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("bucket", &self.bucket)
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("region", &self.region)
            .field("force_path_style", &self.force_path_style)
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

impl StorageConfig {
    /// AWS S3 service configuration with static credentials
    #[must_use]
    pub fn s3_client_config(&self) -> aws_sdk_s3::Config {
        let retry_config = if self.max_attempts > 1 {
            RetryConfig::standard()
                .with_max_attempts(self.max_attempts)
                .with_initial_backoff(Duration::from_millis(50))
        } else {
            RetryConfig::disabled()
        };

        let timeout_config = TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(S3_OPERATION_TIMEOUT_SECS))
            .build();

        let credentials = Credentials::new(
            &self.access_key_id,
            &self.secret_access_key,
            None,
            None,
            "image-host-environment",
        );

        aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(self.region.clone()))
            .endpoint_url(&self.endpoint)
            .credentials_provider(credentials)
            .force_path_style(self.force_path_style)
            .retry_config(retry_config)
            .timeout_config(timeout_config)
            .build()
    }
}

/// Immutable application configuration shared with every handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Deployment stage
    pub environment: Environment,
    /// HTTP listen port
    pub port: u16,
    /// Directory served for the landing page
    pub static_dir: PathBuf,
    /// Honor `X-Forwarded-Proto` / `X-Forwarded-Host` when building page URLs
    pub trust_proxy_headers: bool,
    /// Object store settings
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Reads the configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` when a required value is missing or malformed
    pub fn from_env(environment: Environment) -> Result<Self, ConfigError> {
        Self::from_lookup(environment, |name| env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, treating blank values as unset
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` when a required value is missing or malformed
    pub fn from_lookup<F>(environment: Environment, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let local = environment.allows_local_defaults();
        let required = |name: &'static str, fallback: &str| {
            var(name)
                .or_else(|| local.then(|| fallback.to_string()))
                .ok_or(ConfigError::Missing(name))
        };

        let storage = StorageConfig {
            bucket: required("S3_BUCKET", LOCAL_BUCKET)?,
            endpoint: required("ENDPOINT", LOCAL_ENDPOINT)?,
            access_key_id: required("AWS_ACCESS_KEY_ID", LOCAL_ACCESS_KEY)?,
            secret_access_key: required("AWS_SECRET_ACCESS_KEY", LOCAL_ACCESS_KEY)?,
            region: var("S3_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            force_path_style: parse_or("S3_FORCE_PATH_STYLE", var("S3_FORCE_PATH_STYLE"), local)?,
            max_attempts: parse_or("S3_MAX_ATTEMPTS", var("S3_MAX_ATTEMPTS"), 1)?,
        };

        if storage.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                name: "S3_MAX_ATTEMPTS",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            environment,
            port: parse_or("PORT", var("PORT"), DEFAULT_PORT)?,
            static_dir: var("STATIC_DIR").map_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR), PathBuf::from),
            trust_proxy_headers: parse_or("TRUST_PROXY_HEADERS", var("TRUST_PROXY_HEADERS"), true)?,
            storage,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    value.map_or(Ok(default), |value| {
        value
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { name, value })
    })
}
