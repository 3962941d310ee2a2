mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::Value;

use common::{TestServer, PREFIX};

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let server = TestServer::spawn().await?;

    let res = server.client.get(server.url("/health")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["data"]["database"], "ok");

    server.database.go_offline();
    let res = server.client.get(server.url("/health")).send().await?;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    Ok(())
}

#[tokio::test]
async fn root_lists_the_route_prefix() -> Result<()> {
    let server = TestServer::spawn().await?;

    let body = server.client.get(server.url("/")).send().await?.json::<Value>().await?;
    let routes = body["data"]["endpoints"]["default"].as_str().unwrap_or_default();
    assert!(routes.contains(PREFIX), "unexpected banner: {}", body);
    Ok(())
}
