use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use aide::openapi::OpenApi;
use axum::{extract::DefaultBodyLimit, Extension, Router};
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, timeout::TimeoutLayer, trace::TraceLayer};

use crate::{
    object_store::ObjectStore,
    routes,
    types::{AppConfig, MAX_FORM_FIELD_BYTES, MAX_UPLOAD_BYTES},
};

/// Room for multipart boundaries and part headers
const MULTIPART_FRAMING_BYTES: usize = 64 * 1024;

const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Builds the application router
///
/// API routes are documented through aide; anything else falls through to
/// the static directory, which serves the landing page at `/`.
pub fn router(config: Arc<AppConfig>, object_store: Arc<dyn ObjectStore>) -> Router {
    let mut openapi = OpenApi::default();

    routes::handler()
        .finish_api(&mut openapi)
        .fallback_service(ServeDir::new(&config.static_dir))
        .layer(Extension(Arc::new(openapi)))
        .layer(Extension(config))
        .layer(Extension(object_store))
        // Per-part caps in the extractor trip first; this only bounds the framing
        .layer(DefaultBodyLimit::max(
            MAX_UPLOAD_BYTES + MAX_FORM_FIELD_BYTES + MULTIPART_FRAMING_BYTES,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
}

/// Starts the server with the given configuration and object store
///
/// # Errors
///
/// Returns an error if the server fails to start or bind to the port
pub async fn start(config: AppConfig, object_store: Arc<dyn ObjectStore>) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let router = router(Arc::new(config), object_store);

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Image host listening on http://{addr}");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(anyhow::Error::from)
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
