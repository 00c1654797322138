mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn root_reports_running() -> Result<()> {
    let server = common::ensure_server().await?;
    let body = reqwest::get(server.url("/")).await?.text().await?;
    assert_eq!(body, "API is running...");
    Ok(())
}

#[tokio::test]
async fn health_reports_database_state() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::get(server.url("/health")).await?;

    let status = res.status();
    let body = res.json::<Value>().await?;
    match status {
        StatusCode::OK => assert_eq!(body["database"], "connected"),
        StatusCode::SERVICE_UNAVAILABLE => assert_eq!(body["database"], "disconnected"),
        other => panic!("unexpected status: {}", other),
    }
    assert!(body["timestamp"].is_string());
    Ok(())
}

#[tokio::test]
async fn unknown_route_is_json_404() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::get(server.url("/api/nothing-here")).await?;

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body = res.json::<Value>().await?;
    assert_eq!(body["error"], true);
    assert_eq!(body["message"], "Not Found - /api/nothing-here");
    Ok(())
}

#[tokio::test]
async fn malformed_ids_are_rejected_before_lookup() -> Result<()> {
    let server = common::ensure_server().await?;

    for path in ["/api/products/not-an-id", "/api/categories/not-an-id"] {
        let res = reqwest::get(server.url(path)).await?;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{}", path);
    }
    Ok(())
}

#[tokio::test]
async fn cors_preflight_allows_configured_origin() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .request(reqwest::Method::OPTIONS, server.url("/api/products"))
        .header("Origin", "http://localhost:3000")
        .header("Access-Control-Request-Method", "GET")
        .send()
        .await?;

    assert_eq!(
        res.headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("http://localhost:3000")
    );
    assert_eq!(
        res.headers()
            .get("access-control-allow-credentials")
            .and_then(|v| v.to_str().ok()),
        Some("true")
    );
    Ok(())
}
