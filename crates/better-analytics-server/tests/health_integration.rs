mod common;

use axum::http::StatusCode;

use common::{get, json_body, setup};

#[tokio::test]
async fn health_reports_ok_with_version() {
    let (_, app) = setup().await;
    let response = get(&app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}
