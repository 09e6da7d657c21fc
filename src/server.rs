/// HTTP server setup and routing
use crate::{
    context::AppContext,
    error::{CmsError, CmsResult},
    media::PUBLIC_PREFIX,
    rate_limit::rate_limit_middleware,
};
use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::Json,
    routing::get,
    Router,
};
use serde_json::json;
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{info, warn};

/// Any origin in development, the configured one in production
fn cors_layer(ctx: &AppContext) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if ctx.config.is_development() {
        return cors.allow_origin(Any);
    }

    match ctx.config.service.cors_origin.as_deref().map(HeaderValue::from_str) {
        Some(Ok(origin)) => cors.allow_origin(origin),
        Some(Err(e)) => {
            warn!("Ignoring unparsable CORS origin: {}", e);
            cors
        }
        None => cors,
    }
}

/// Build the main application router
/// Returns Router<()> because state is already provided
pub fn build_router(ctx: AppContext) -> Router {
    let cors = cors_layer(&ctx);
    let uploads = ServeDir::new(ctx.media.dir());

    Router::new()
        .route("/health", get(health_check))
        .merge(crate::api::routes())
        .nest_service(PUBLIC_PREFIX, uploads)
        .with_state(ctx.clone())
        // Rate limiting runs after state so it can reach the limiter
        .layer(middleware::from_fn_with_state(ctx, rate_limit_middleware))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .fallback(not_found)
}

/// Health check handler
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// 404 handler
async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "NotFound",
            "message": "Endpoint not found"
        })),
    )
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Start the HTTP server
pub async fn serve(ctx: AppContext) -> CmsResult<()> {
    let addr = format!("{}:{}", ctx.config.service.hostname, ctx.config.service.port);

    info!("Ecosystem CMS listening on {}", addr);
    info!("   Service URL: {}", ctx.service_url());
    info!("   Public URL: {}", ctx.config.service.public_url);

    let app = build_router(ctx);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| CmsError::Internal(format!("Failed to bind to {}: {}", addr, e)))?;

    // Peer addresses key the rate limiter when no proxy header is present
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| CmsError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
