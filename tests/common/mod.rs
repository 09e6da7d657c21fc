/// Shared helpers for the end-to-end tests
use axum::{
    body::{to_bytes, Body},
    extract::ConnectInfo,
    http::{header, Request, StatusCode},
    Router,
};
use ecosystem_cms::{config::ServerConfig, context::AppContext, server::build_router};
use serde_json::Value;
use std::net::{IpAddr, SocketAddr};
use tower::ServiceExt;

pub const SECRET: &str = "test-secret-key-for-testing-only-0123456789";

#[allow(dead_code)]
pub async fn app() -> (Router, AppContext) {
    app_with(ServerConfig::development(SECRET)).await
}

pub async fn app_with(config: ServerConfig) -> (Router, AppContext) {
    let ctx = AppContext::new(config).await.unwrap();
    (build_router(ctx.clone()), ctx)
}

/// One request through the router from peer address `source`
#[allow(dead_code)]
pub async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    source: &str,
) -> (StatusCode, Value) {
    call_forwarded(app, method, uri, body, source, None).await
}

/// Like [`call`], optionally carrying an `X-Forwarded-For` header
pub async fn call_forwarded(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    source: &str,
    forwarded_for: Option<&str>,
) -> (StatusCode, Value) {
    let peer: IpAddr = source.parse().unwrap();
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .extension(ConnectInfo(SocketAddr::new(peer, 40000)));
    if let Some(forwarded) = forwarded_for {
        builder = builder.header("x-forwarded-for", forwarded);
    }
    let body = match body {
        Some(v) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}
