/// Session endpoints under /api/auth
use crate::{
    account::{
        LoginRequest, RefreshRequest, RefreshResponse, RegisterRequest, RegisterResponse,
        ResetConfirm, ResetRequest, SessionResponse,
    },
    api::{middleware::JsonBody, MessageResponse},
    auth::AuthClaims,
    context::AppContext,
    db::account::PublicUser,
    error::CmsResult,
};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

/// Same answer whether or not the email is known
const RESET_REQUESTED_MESSAGE: &str =
    "If the email is registered, password reset instructions have been sent";

/// Build session routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/reset-password/request", post(request_password_reset))
        .route("/reset-password/confirm", post(confirm_password_reset))
        .route("/me", get(me))
}

async fn register(
    State(ctx): State<AppContext>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> CmsResult<(StatusCode, Json<RegisterResponse>)> {
    let response = ctx.sessions.register(req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn login(
    State(ctx): State<AppContext>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> CmsResult<Json<SessionResponse>> {
    Ok(Json(ctx.sessions.login(req).await?))
}

async fn refresh(
    State(ctx): State<AppContext>,
    JsonBody(req): JsonBody<RefreshRequest>,
) -> CmsResult<Json<RefreshResponse>> {
    Ok(Json(ctx.sessions.refresh(req.refresh_token.as_deref()).await?))
}

async fn logout(
    State(ctx): State<AppContext>,
    JsonBody(req): JsonBody<RefreshRequest>,
) -> Json<MessageResponse> {
    ctx.sessions.logout(req.refresh_token.as_deref()).await;
    Json(MessageResponse::new("Logged out successfully"))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetRequestResponse {
    pub message: String,
    /// Plaintext token, only exposed in development
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_token: Option<String>,
}

async fn request_password_reset(
    State(ctx): State<AppContext>,
    JsonBody(req): JsonBody<ResetRequest>,
) -> CmsResult<Json<ResetRequestResponse>> {
    let ticket = ctx
        .sessions
        .request_password_reset(req.email.as_deref())
        .await?;

    let debug_token = match ticket {
        Some(ticket) => {
            if ctx.mailer.is_configured() {
                // Delivery happens off the request path; failures are only logged
                let mailer = ctx.mailer.clone();
                let base_url = ctx.config.service.public_url.clone();
                let token = ticket.token.clone();
                let user = ticket.user.clone();
                tokio::spawn(async move {
                    if let Err(e) = mailer
                        .send_password_reset_email(&user.email, &user.username, &token, &base_url)
                        .await
                    {
                        tracing::warn!("Failed to send reset email to {}: {}", user.email, e);
                    }
                });
            }

            ctx.config.is_development().then_some(ticket.token)
        }
        None => None,
    };

    Ok(Json(ResetRequestResponse {
        message: RESET_REQUESTED_MESSAGE.to_string(),
        debug_token,
    }))
}

async fn confirm_password_reset(
    State(ctx): State<AppContext>,
    JsonBody(req): JsonBody<ResetConfirm>,
) -> CmsResult<Json<MessageResponse>> {
    ctx.sessions.confirm_password_reset(req).await?;
    Ok(Json(MessageResponse::new("Password changed successfully")))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub user: PublicUser,
}

async fn me(
    State(ctx): State<AppContext>,
    AuthClaims(claims): AuthClaims,
) -> CmsResult<Json<MeResponse>> {
    let user = ctx.sessions.current_user(&claims.id).await?;
    Ok(Json(MeResponse { user }))
}
