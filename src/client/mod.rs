/// Client-side session cache
///
/// Keeps the signed-in user and their tokens for programs talking to the API,
/// mirrors them into a [`SessionStorage`], and transparently refreshes the
/// access token once when a request comes back 401.
pub mod storage;

pub use storage::{FileSessionStorage, MemorySessionStorage, SessionStorage, StoredSession};

use crate::{
    account::{RefreshResponse, SessionResponse},
    db::account::{PublicUser, Role},
    error::ErrorResponse,
};
use reqwest::{
    header::{HeaderValue, InvalidHeaderValue, AUTHORIZATION},
    Method, Request, RequestBuilder, Response, StatusCode,
};
use serde_json::json;
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Errors surfaced by the session client
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response from the server
    #[error("{status} {error}: {message}")]
    Api {
        status: StatusCode,
        error: String,
        message: String,
    },

    #[error("No refresh token available")]
    NotAuthenticated,

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] InvalidHeaderValue),

    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// HTTP status for server-side failures
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status(),
            _ => None,
        }
    }

    async fn from_response(response: Response) -> Self {
        let status = response.status();
        match response.json::<ErrorResponse>().await {
            Ok(body) => ClientError::Api {
                status,
                error: body.error,
                message: body.message,
            },
            Err(_) => ClientError::Api {
                status,
                error: status
                    .canonical_reason()
                    .unwrap_or("Unknown")
                    .to_string(),
                message: String::new(),
            },
        }
    }
}

/// Session-aware API client
pub struct SessionClient {
    http: reqwest::Client,
    base_url: String,
    storage: Arc<dyn SessionStorage>,
    session: RwLock<StoredSession>,
}

impl SessionClient {
    pub fn new(
        base_url: impl Into<String>,
        storage: Arc<dyn SessionStorage>,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("ecosystem-cms/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            storage,
            session: RwLock::new(StoredSession::default()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Start a request against the API; pass the built request to [`send`](Self::send)
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, self.url(path))
    }

    /// Restore a cached session and confirm it with a refresh
    ///
    /// Returns whether a session is active afterwards.
    pub async fn boot(&self) -> bool {
        let cached = match self.storage.load().await {
            Ok(cached) => cached,
            Err(e) => {
                debug!("Discarding unreadable session cache: {}", e);
                self.clear_session().await;
                return false;
            }
        };

        if cached.user.is_none() || cached.access_token.is_none() {
            self.clear_session().await;
            return false;
        }

        // Show the cached user right away; the refresh confirms it
        *self.session.write().await = cached;

        match self.refresh().await {
            Ok(_) => true,
            Err(e) => {
                debug!("Cached session rejected: {}", e);
                false
            }
        }
    }

    /// Sign in; failures are logged and reported as `false`
    pub async fn login(&self, username: &str, password: &str) -> bool {
        match self.try_login(username, password).await {
            Ok(session) => {
                info!("Signed in as {}", session.user.username);
                *self.session.write().await = StoredSession {
                    user: Some(session.user),
                    access_token: Some(session.access_token),
                    refresh_token: Some(session.refresh_token),
                };
                self.persist().await;
                true
            }
            Err(e) => {
                warn!("Login failed: {}", e);
                false
            }
        }
    }

    async fn try_login(&self, username: &str, password: &str) -> Result<SessionResponse, ClientError> {
        let response = self
            .http
            .post(self.url("/api/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::from_response(response).await);
        }
        Ok(response.json().await?)
    }

    /// Tell the server to forget the refresh token, then drop everything locally
    pub async fn logout(&self) {
        let refresh_token = self.session.read().await.refresh_token.clone();

        if let Some(token) = refresh_token {
            let result = self
                .http
                .post(self.url("/api/auth/logout"))
                .json(&json!({ "refreshToken": token }))
                .send()
                .await;
            if let Err(e) = result {
                debug!("Server logout failed: {}", e);
            }
        }

        self.clear_session().await;
    }

    /// Trade the refresh token for a new access token
    ///
    /// Any failure ends the session.
    pub async fn refresh(&self) -> Result<String, ClientError> {
        let refresh_token = self.session.read().await.refresh_token.clone();
        let Some(refresh_token) = refresh_token else {
            self.clear_session().await;
            return Err(ClientError::NotAuthenticated);
        };

        match self.request_refresh(&refresh_token).await {
            Ok(access_token) => {
                self.session.write().await.access_token = Some(access_token.clone());
                self.persist().await;
                Ok(access_token)
            }
            Err(e) => {
                self.logout().await;
                Err(e)
            }
        }
    }

    async fn request_refresh(&self, refresh_token: &str) -> Result<String, ClientError> {
        let response = self
            .http
            .post(self.url("/api/auth/refresh"))
            .json(&json!({ "refreshToken": refresh_token }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::from_response(response).await);
        }
        let body: RefreshResponse = response.json().await?;
        Ok(body.access_token)
    }

    /// Send a request with the current access token
    ///
    /// A 401 triggers one refresh and one retry. The retry's response is
    /// returned whatever its status. Requests with streaming bodies cannot be
    /// replayed and are returned after the first attempt.
    pub async fn send(&self, request: Request) -> Result<Response, ClientError> {
        let retry = request.try_clone();
        let response = self.execute(request).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        let Some(retry) = retry else {
            return Ok(response);
        };

        debug!("Access token rejected, refreshing");
        self.refresh().await?;
        self.execute(retry).await
    }

    async fn execute(&self, mut request: Request) -> Result<Response, ClientError> {
        if let Some(token) = self.access_token().await {
            request
                .headers_mut()
                .insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", token))?);
        }
        Ok(self.http.execute(request).await?)
    }

    pub async fn access_token(&self) -> Option<String> {
        self.session.read().await.access_token.clone()
    }

    pub async fn user(&self) -> Option<PublicUser> {
        self.session.read().await.user.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        let session = self.session.read().await;
        session.user.is_some() && session.access_token.is_some()
    }

    pub async fn is_admin(&self) -> bool {
        self.session
            .read()
            .await
            .user
            .as_ref()
            .is_some_and(|u| u.role == Role::Admin)
    }

    async fn persist(&self) {
        let snapshot = self.session.read().await.clone();
        if let Err(e) = self.storage.save(&snapshot).await {
            warn!("Failed to persist session: {}", e);
        }
    }

    async fn clear_session(&self) {
        *self.session.write().await = StoredSession::default();
        if let Err(e) = self.storage.clear().await {
            warn!("Failed to clear stored session: {}", e);
        }
    }
}
