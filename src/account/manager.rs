/// Session lifecycle: registration, login, refresh, logout and password reset
use crate::{
    account::{
        repository::UserRepository, token::TokenService, LoginRequest, PasswordResetTicket,
        RefreshResponse, RegisterRequest, RegisterResponse, ResetConfirm, SessionResponse,
    },
    config::{BootstrapAdminConfig, ServerConfig},
    crypto::{generate_reset_token, hash_password, hash_reset_token, verify_password},
    db::account::{NewUser, PublicUser, Role, User, EMAIL_TAKEN, USERNAME_TAKEN},
    error::{CmsError, CmsResult},
    validation::{is_valid_password, validate_login_input, validate_register_input},
};
use chrono::{Duration, Utc};
use std::sync::Arc;

const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Empty strings count as absent
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Session manager service
pub struct SessionManager {
    users: Arc<dyn UserRepository>,
    tokens: Arc<TokenService>,
    config: Arc<ServerConfig>,
}

impl SessionManager {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: Arc<TokenService>,
        config: Arc<ServerConfig>,
    ) -> Self {
        Self {
            users,
            tokens,
            config,
        }
    }

    /// Issue both tokens for a user and record the refresh token
    async fn start_session(&self, user: &User) -> CmsResult<SessionResponse> {
        let access_token = self
            .tokens
            .issue_access_token(&user.id, &user.username, user.role)?;
        let refresh = self.tokens.issue_refresh_token(&user.id, &user.username)?;
        let refresh_token = refresh.token.clone();

        self.users.add_refresh_token(&user.id, refresh).await?;

        Ok(SessionResponse {
            access_token,
            refresh_token,
            user: user.to_public(),
        })
    }

    /// Register a new account and sign it in
    pub async fn register(&self, req: RegisterRequest) -> CmsResult<RegisterResponse> {
        validate_register_input(
            req.username.as_deref(),
            req.email.as_deref(),
            req.password.as_deref(),
        )?;

        // Validation guarantees all three are present
        let (Some(username), Some(email), Some(password)) = (req.username, req.email, req.password)
        else {
            return Err(CmsError::Validation("Missing registration fields".to_string()));
        };
        let email = email.to_lowercase();

        if self.users.find_by_username(&username).await?.is_some() {
            return Err(CmsError::Conflict(USERNAME_TAKEN.to_string()));
        }
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(CmsError::Conflict(EMAIL_TAKEN.to_string()));
        }

        let password_hash = hash_password(&password)?;
        let user = self
            .users
            .insert(NewUser {
                username,
                email,
                password_hash,
                role: self.config.authentication.registration_default_role,
            })
            .await?;

        tracing::info!("Registered user {} ({})", user.username, user.id);

        let session = self.start_session(&user).await?;
        Ok(RegisterResponse {
            message: "User registered successfully".to_string(),
            session,
        })
    }

    /// Verify credentials and open a new session
    pub async fn login(&self, req: LoginRequest) -> CmsResult<SessionResponse> {
        validate_login_input(req.username.as_deref(), req.password.as_deref())?;
        let username = req.username.unwrap_or_default();
        let password = req.password.unwrap_or_default();

        // Unknown user and wrong password are indistinguishable
        let Some(mut user) = self.users.find_by_username(&username).await? else {
            tracing::debug!("Login failed: unknown user {}", username);
            return Err(CmsError::Authentication(INVALID_CREDENTIALS.to_string()));
        };

        if !verify_password(&password, &user.password_hash)? {
            tracing::debug!("Login failed: wrong password for {}", username);
            return Err(CmsError::Authentication(INVALID_CREDENTIALS.to_string()));
        }

        let now = Utc::now();
        self.users.record_login(&user.id, now).await?;
        user.last_login = Some(now);
        user.updated_at = now;

        tracing::info!("User {} logged in", user.username);
        self.start_session(&user).await
    }

    /// Exchange a held refresh token for a new access token
    ///
    /// The refresh token itself is not rotated.
    pub async fn refresh(&self, refresh_token: Option<&str>) -> CmsResult<RefreshResponse> {
        let token = refresh_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CmsError::Authentication("Refresh token is required".to_string()))?;

        let claims = self.tokens.verify_refresh(token).map_err(|_| {
            CmsError::Authorization("Invalid or expired refresh token".to_string())
        })?;

        let user = match self.users.find_by_id(&claims.id).await? {
            Some(user) if user.has_refresh_token(token) => user,
            _ => {
                tracing::debug!("Refresh rejected: token not held by user {}", claims.id);
                return Err(CmsError::Authorization("Invalid refresh token".to_string()));
            }
        };

        // Role comes from the current record, not the token
        let access_token = self
            .tokens
            .issue_access_token(&user.id, &user.username, user.role)?;

        Ok(RefreshResponse { access_token })
    }

    /// Revoke a refresh token; never fails
    pub async fn logout(&self, refresh_token: Option<&str>) {
        let Some(token) = refresh_token.filter(|t| !t.is_empty()) else {
            return;
        };

        let claims = match self.tokens.verify_refresh(token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!("Logout with unusable refresh token: {}", e);
                return;
            }
        };

        match self.users.remove_refresh_token(&claims.id, token).await {
            Ok(true) => tracing::info!("User {} logged out", claims.username),
            Ok(false) => tracing::debug!("Logout: token already revoked for {}", claims.id),
            Err(e) => tracing::debug!("Logout: failed to revoke token: {}", e),
        }
    }

    /// Start a password reset
    ///
    /// Returns `None` when no account has this email; callers must respond the
    /// same way in both cases.
    pub async fn request_password_reset(
        &self,
        email: Option<&str>,
    ) -> CmsResult<Option<PasswordResetTicket>> {
        let email = email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| CmsError::Validation("Email is required".to_string()))?
            .to_lowercase();

        let Some(user) = self.users.find_by_email(&email).await? else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(None);
        };

        let token = generate_reset_token();
        let expires_at =
            Utc::now() + Duration::seconds(self.config.authentication.reset_token_ttl_secs);

        self.users
            .set_password_reset(&user.id, &hash_reset_token(&token), expires_at)
            .await?;

        tracing::info!("Password reset token for {}: {}", email, token);

        Ok(Some(PasswordResetTicket {
            token,
            user: user.to_public(),
        }))
    }

    /// Finish a password reset and revoke every session of the user
    pub async fn confirm_password_reset(&self, req: ResetConfirm) -> CmsResult<()> {
        let (Some(token), Some(new_password)) = (present(&req.token), present(&req.new_password))
        else {
            return Err(CmsError::Validation(
                "Token and new password are required".to_string(),
            ));
        };

        if !is_valid_password(new_password) {
            return Err(CmsError::Validation(
                "Password must be at least 6 characters".to_string(),
            ));
        }

        let user = self
            .users
            .find_by_reset_token(&hash_reset_token(token))
            .await?
            .filter(|u| matches!(u.password_reset_expires, Some(exp) if exp > Utc::now()))
            .ok_or(CmsError::InvalidOrExpiredToken)?;

        let password_hash = hash_password(new_password)?;
        self.users
            .complete_password_reset(&user.id, &password_hash)
            .await?;

        tracing::info!("Password changed for {}; all sessions revoked", user.username);
        Ok(())
    }

    pub async fn current_user(&self, id: &str) -> CmsResult<PublicUser> {
        self.users
            .find_by_id(id)
            .await?
            .map(|u| u.to_public())
            .ok_or_else(|| CmsError::NotFound("User not found".to_string()))
    }

    /// Create the configured admin account unless the username is taken
    ///
    /// Returns whether an account was created.
    pub async fn ensure_admin(&self, admin: &BootstrapAdminConfig) -> CmsResult<bool> {
        if self.users.find_by_username(&admin.username).await?.is_some() {
            tracing::info!("Admin user {} already exists", admin.username);
            return Ok(false);
        }

        if !is_valid_password(&admin.password) {
            return Err(CmsError::Validation(
                "Admin password must be at least 6 characters".to_string(),
            ));
        }

        let user = self
            .users
            .insert(NewUser {
                username: admin.username.clone(),
                email: admin.email.to_lowercase(),
                password_hash: hash_password(&admin.password)?,
                role: Role::Admin,
            })
            .await?;

        tracing::info!("Created admin user {} ({})", user.username, user.id);
        Ok(true)
    }
}
