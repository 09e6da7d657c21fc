/// API routes and handlers
pub mod auth;
pub mod content;
pub mod media;
pub mod middleware;

use crate::context::AppContext;
use axum::{routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// `{message}` body used by logout, reset and delete endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api", get(index))
        .nest("/api/auth", auth::routes())
        .nest("/api/content", content::routes())
        .nest("/api/media", media::routes())
}

/// Service index
async fn index() -> Json<Value> {
    Json(json!({
        "name": "Ecosystem CMS API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "auth": "/api/auth",
            "content": "/api/content",
            "media": "/api/media",
            "health": "/health"
        }
    }))
}
