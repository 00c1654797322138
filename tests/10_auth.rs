mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::Value;

async fn assert_unauthorized(res: reqwest::Response, message: &str) -> Result<()> {
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = res.json::<Value>().await?;
    assert_eq!(body["error"], true);
    assert_eq!(body["message"], message);
    Ok(())
}

#[tokio::test]
async fn profile_requires_token() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client.get(server.url("/api/users/profile")).send().await?;
    assert_unauthorized(res, "Not authorized, no token").await
}

#[tokio::test]
async fn garbage_token_is_rejected() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(server.url("/api/orders/myorders"))
        .bearer_auth("not.a.jwt")
        .send()
        .await?;
    assert_unauthorized(res, "Not authorized, token failed").await
}

#[tokio::test]
async fn non_bearer_scheme_counts_as_missing() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(server.url("/api/users/wishlist"))
        .header("Authorization", "Basic dXNlcjpwYXNz")
        .send()
        .await?;
    assert_unauthorized(res, "Not authorized, no token").await
}

#[tokio::test]
async fn admin_routes_require_token() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    for path in [
        "/api/users",
        "/api/orders",
        "/api/orders/search?keyword=abc",
        "/api/admin/dashboard",
        "/api/admin/dashboard/low-stock",
        "/api/admin/settings",
    ] {
        let res = client.get(server.url(path)).send().await?;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{}", path);
    }
    Ok(())
}

#[tokio::test]
async fn admin_writes_are_checked_before_the_body() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    // Multipart product create: no token, no form, still 401
    let res = client.post(server.url("/api/products")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .put(server.url("/api/admin/settings/store"))
        .json(&serde_json::json!({ "storeName": "x" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .post(server.url("/api/categories"))
        .json(&serde_json::json!({ "name": "Bánh", "slug": "banh" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}
