use std::path::PathBuf;
use std::sync::Arc;

use axum::{body::Body, http::Request, response::Response, Router};
use image_host::{
    object_store::mock::InMemoryObjectStore,
    server,
    types::{AppConfig, Environment},
};
use tower::ServiceExt;

use super::{multipart_body, FormPart, BOUNDARY, TEST_HOST};

/// Setup tracing once for the test binary
pub fn setup_test_env() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init()
        .ok();
}

/// Development configuration with no environment variables set
pub fn test_config(environment: Environment) -> AppConfig {
    AppConfig::from_lookup(environment, |_| None).unwrap_or_else(|_| {
        // Production/staging require storage values; tests never reach S3
        AppConfig::from_lookup(environment, |name| match name {
            "S3_BUCKET" => Some("images".to_string()),
            "ENDPOINT" => Some("http://localhost:4566".to_string()),
            "AWS_ACCESS_KEY_ID" | "AWS_SECRET_ACCESS_KEY" => Some("test".to_string()),
            _ => None,
        })
        .expect("test config must be valid")
    })
}

/// Router wired to an in-memory object store
pub struct TestSetup {
    pub router: Router,
    pub object_store: Arc<InMemoryObjectStore>,
    pub config: Arc<AppConfig>,
}

impl TestSetup {
    pub fn new() -> Self {
        Self::with_config(test_config(Environment::Development))
    }

    pub fn with_static_dir(static_dir: PathBuf) -> Self {
        let mut config = test_config(Environment::Development);
        config.static_dir = static_dir;
        Self::with_config(config)
    }

    pub fn with_config(config: AppConfig) -> Self {
        setup_test_env();

        let config = Arc::new(config);
        let object_store = Arc::new(InMemoryObjectStore::new());
        let router = server::router(config.clone(), object_store.clone());

        Self {
            router,
            object_store,
            config,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn send_get_request(&self, route: &str) -> Response {
        let request = Request::builder()
            .uri(route)
            .method("GET")
            .header("host", TEST_HOST)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    pub async fn upload(&self, parts: &[FormPart]) -> Response {
        self.send(upload_request(parts)).await
    }
}

/// `POST /upload` carrying `parts` as `multipart/form-data`
pub fn upload_request(parts: &[FormPart]) -> Request<Body> {
    Request::builder()
        .uri("/upload")
        .method("POST")
        .header("host", TEST_HOST)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}
