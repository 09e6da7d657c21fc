/// Account and session management
///
/// Handles registration, login, token refresh and revocation, password reset,
/// and the user stores behind them.

mod manager;
pub mod memory;
pub mod repository;
pub mod token;

pub use manager::SessionManager;
pub use memory::InMemoryUserStore;
pub use repository::UserRepository;
pub use token::{AccessClaims, RefreshClaims, TokenService};

use crate::db::account::PublicUser;
use serde::{Deserialize, Serialize};

/// Registration request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Login request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Body of refresh and logout calls
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// Password-reset request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResetRequest {
    pub email: Option<String>,
}

/// Password-reset confirmation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResetConfirm {
    pub token: Option<String>,
    pub new_password: Option<String>,
}

/// Tokens and user returned by login and registration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: PublicUser,
}

/// Registration response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    #[serde(flatten)]
    pub session: SessionResponse,
}

/// Refresh response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

/// Outstanding reset issued for an existing user
#[derive(Debug, Clone)]
pub struct PasswordResetTicket {
    /// Plaintext token; only its digest is stored
    pub token: String,
    pub user: PublicUser,
}
