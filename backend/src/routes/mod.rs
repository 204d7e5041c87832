mod docs;
pub mod health;
pub mod images;

use aide::axum::{
    routing::{get, post},
    ApiRouter,
};

/// Creates the router with all handler routes
pub fn handler() -> ApiRouter {
    ApiRouter::new()
        .merge(docs::handler())
        .api_route("/health", get(health::handler))
        .api_route("/upload", post(images::upload_image))
        .api_route("/i/{id}", get(images::view_image))
}
