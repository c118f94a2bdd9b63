/// Integration test for the health endpoint
///
/// Requires `DATABASE_URL`; returns early without it.

mod common;

use axum::http::{Method, StatusCode};
use common::TestContext;

#[tokio::test]
async fn test_health_reports_connected_database() {
    let Some(ctx) = TestContext::new().await else { return };

    let (status, body) = ctx.send_as(None, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["pool"]["total"].as_u64().unwrap() >= 1);

    ctx.cleanup().await;
}
