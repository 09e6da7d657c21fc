/// Authentication extractors
use crate::{
    account::AccessClaims,
    api::middleware::extract_bearer_token,
    context::AppContext,
    db::account::User,
    error::CmsError,
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Caller holding a valid access token
#[derive(Debug, Clone)]
pub struct AuthClaims(pub AccessClaims);

#[async_trait]
impl FromRequestParts<AppContext> for AuthClaims {
    type Rejection = CmsError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)
            .ok_or_else(|| CmsError::Authentication("Access token required".to_string()))?;

        let claims = state.tokens.verify_access(&token)?;
        Ok(AuthClaims(claims))
    }
}

/// Caller whose account still exists and has the admin role
///
/// The role is read from the stored record, so a demotion takes effect
/// before the access token expires.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppContext> for AdminUser {
    type Rejection = CmsError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let AuthClaims(claims) = AuthClaims::from_request_parts(parts, state).await?;

        let user = state
            .users
            .find_by_id(&claims.id)
            .await?
            .ok_or_else(|| CmsError::Authentication("User no longer exists".to_string()))?;

        if !user.is_admin() {
            tracing::warn!("User {} attempted an admin action", user.username);
            return Err(CmsError::Authorization("Admin role required".to_string()));
        }

        Ok(AdminUser(user))
    }
}
