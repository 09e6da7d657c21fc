/// Signed access and refresh tokens
use crate::{
    config::AuthConfig,
    crypto::generate_token_id,
    db::account::{RefreshTokenEntry, Role},
    error::{CmsError, CmsResult},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Claims carried by an access token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub id: String,
    pub username: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Claims carried by a refresh token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub id: String,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Issues and verifies HS256 tokens with the configured secret
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, access_ttl_secs: i64, refresh_ttl_secs: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_ttl: Duration::seconds(access_ttl_secs),
            refresh_ttl: Duration::seconds(refresh_ttl_secs),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            &config.jwt_secret,
            config.access_token_ttl_secs,
            config.refresh_token_ttl_secs,
        )
    }

    fn sign<T: Serialize>(&self, claims: &T) -> CmsResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| CmsError::Jwt(format!("Failed to sign token: {}", e)))
    }

    /// Bad signatures, expiry and malformed payloads all look the same to callers
    fn verify<T: DeserializeOwned>(&self, token: &str) -> CmsResult<T> {
        decode::<T>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Token verification failed: {}", e);
                CmsError::Authentication("Invalid or expired token".to_string())
            })
    }

    pub fn issue_access_token(&self, id: &str, username: &str, role: Role) -> CmsResult<String> {
        let now = Utc::now();
        self.sign(&AccessClaims {
            id: id.to_string(),
            username: username.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
        })
    }

    /// Sign a refresh token and describe it for the user's token list
    pub fn issue_refresh_token(&self, id: &str, username: &str) -> CmsResult<RefreshTokenEntry> {
        let now = Utc::now();
        let expires_at = now + self.refresh_ttl;

        let token = self.sign(&RefreshClaims {
            id: id.to_string(),
            username: username.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: generate_token_id(),
        })?;

        Ok(RefreshTokenEntry {
            token,
            created_at: now,
            expires_at,
        })
    }

    pub fn verify_access(&self, token: &str) -> CmsResult<AccessClaims> {
        self.verify(token)
    }

    pub fn verify_refresh(&self, token: &str) -> CmsResult<RefreshClaims> {
        self.verify(token)
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-for-testing-only-0123456789";

    fn service() -> TokenService {
        TokenService::new(SECRET, 86400, 604800)
    }

    #[test]
    fn test_access_token_round_trip() {
        let tokens = service();
        let token = tokens.issue_access_token("u1", "alice", Role::Admin).unwrap();

        let claims = tokens.verify_access(&token).unwrap();
        assert_eq!(claims.id, "u1");
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, 86400);
    }

    #[test]
    fn test_refresh_tokens_are_distinct() {
        let tokens = service();
        let a = tokens.issue_refresh_token("u1", "alice").unwrap();
        let b = tokens.issue_refresh_token("u1", "alice").unwrap();
        assert_ne!(a.token, b.token);
        assert_eq!((a.expires_at - a.created_at).num_days(), 7);

        let claims = tokens.verify_refresh(&a.token).unwrap();
        assert_eq!(claims.id, "u1");
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = TokenService::new(SECRET, -10, -10);
        let token = tokens.issue_access_token("u1", "alice", Role::User).unwrap();

        match tokens.verify_access(&token) {
            Err(CmsError::Authentication(msg)) => assert_eq!(msg, "Invalid or expired token"),
            _ => panic!("Expected Authentication error"),
        }
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = service().issue_access_token("u1", "alice", Role::User).unwrap();
        let other = TokenService::new("another-secret-key-for-testing-0123456789", 86400, 604800);

        match other.verify_access(&token) {
            Err(CmsError::Authentication(msg)) => assert_eq!(msg, "Invalid or expired token"),
            _ => panic!("Expected Authentication error"),
        }
    }

    #[test]
    fn test_token_kinds_not_interchangeable() {
        let tokens = service();
        let access = tokens.issue_access_token("u1", "alice", Role::User).unwrap();
        let refresh = tokens.issue_refresh_token("u1", "alice").unwrap();

        assert!(tokens.verify_refresh(&access).is_err());
        assert!(tokens.verify_access(&refresh.token).is_err());
    }
}
