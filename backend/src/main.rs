use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;

use image_host::{
    object_store::{ObjectStore, S3ObjectStore},
    server,
    types::{AppConfig, Environment},
};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let environment = Environment::from_env()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // JSON lines for staging/production log shipping, plain text locally
    if environment.json_logs() {
        fmt().json().with_env_filter(env_filter).init();
    } else {
        fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env(environment)?;
    tracing::info!("Loaded configuration: {:?}", config);

    let s3_client = Arc::new(S3Client::from_conf(config.storage.s3_client_config()));
    let object_store: Arc<dyn ObjectStore> =
        Arc::new(S3ObjectStore::new(s3_client, config.storage.bucket.clone()));

    server::start(config, object_store).await
}
