/// Request helpers shared by the handlers and middleware
use crate::error::CmsError;
use axum::{
    async_trait,
    body::Bytes,
    extract::{ConnectInfo, FromRequest, Multipart, Request},
    http::HeaderMap,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::net::SocketAddr;

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Identify the request source for rate limiting
///
/// The peer address, else `unknown`. The first `X-Forwarded-For` entry is used
/// instead only when `trust_proxy` is set; otherwise any client could pick its
/// own key.
pub fn client_key(request: &Request, trust_proxy: bool) -> String {
    if trust_proxy {
        let forwarded = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// JSON request body whose failures surface as `ValidationError`
///
/// An empty body reads as `{}` so that handlers can report missing fields
/// themselves.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = CmsError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| CmsError::Validation(format!("Unreadable request body: {}", e)))?;

        let value = if bytes.iter().all(u8::is_ascii_whitespace) {
            Value::Object(Default::default())
        } else {
            serde_json::from_slice(&bytes)
                .map_err(|e| CmsError::Validation(format!("Malformed JSON: {}", e)))?
        };

        serde_json::from_value(value)
            .map(JsonBody)
            .map_err(|e| CmsError::Validation(format!("Invalid request body: {}", e)))
    }
}

/// Multipart form whose rejection surfaces as `ValidationError`
pub struct FormData(pub Multipart);

#[async_trait]
impl<S> FromRequest<S> for FormData
where
    S: Send + Sync,
{
    type Rejection = CmsError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Multipart::from_request(req, state)
            .await
            .map(FormData)
            .map_err(|e| CmsError::Validation(format!("Expected multipart form data: {}", e)))
    }
}
