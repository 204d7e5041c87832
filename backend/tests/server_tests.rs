mod common;

use common::*;

use axum::http::StatusCode;
use image_host::types::Environment;

#[tokio::test]
async fn test_landing_page_served_from_static_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("index.html"),
        "<html><body>upload here</body></html>",
    )
    .unwrap();
    let setup = TestSetup::with_static_dir(dir.path().to_path_buf());

    let response = setup.send_get_request("/").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_bytes(response).await;
    assert!(String::from_utf8_lossy(&body).contains("upload here"));
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let setup = TestSetup::with_static_dir(dir.path().to_path_buf());

    let response = setup.send_get_request("/nope.txt").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health() {
    let setup = TestSetup::new();

    let response = setup.send_get_request("/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["semver"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_openapi_lists_routes_in_development() {
    let setup = TestSetup::new();

    let response = setup.send_get_request("/openapi.json").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert!(body["paths"]["/upload"].is_object());
    assert!(body["paths"]["/i/{id}"].is_object());
}

#[tokio::test]
async fn test_openapi_hidden_in_production() {
    let setup = TestSetup::with_config(test_config(Environment::Production));

    let response = setup.send_get_request("/openapi.json").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
