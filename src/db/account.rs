/// User records shared by every user store
use crate::error::CmsError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Conflict reported for a duplicate username
pub const USERNAME_TAKEN: &str = "A user with this username already exists";
/// Conflict reported for a duplicate email
pub const EMAIL_TAKEN: &str = "A user with this email already exists";

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = CmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(CmsError::Validation(format!("Unknown role: {}", other))),
        }
    }
}

/// Outstanding refresh token held by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshTokenEntry {
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Stored user record
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub refresh_tokens: Vec<RefreshTokenEntry>,
    /// SHA-256 hex digest of the outstanding reset token
    pub password_reset_token: Option<String>,
    pub password_reset_expires: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn has_refresh_token(&self, token: &str) -> bool {
        self.refresh_tokens.iter().any(|rt| rt.token == token)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// View safe to return to clients
    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role,
            last_login: self.last_login,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// User without any secret material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for inserting a user; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

impl NewUser {
    pub fn into_user(self, id: String, now: DateTime<Utc>) -> User {
        User {
            id,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            role: self.role,
            refresh_tokens: Vec::new(),
            password_reset_token: None,
            password_reset_expires: None,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_view_omits_secrets() {
        let now = Utc::now();
        let mut user = NewUser {
            username: "alice".to_string(),
            email: "a@x.com".to_string(),
            password_hash: "$argon2id$v=19$...".to_string(),
            role: Role::Admin,
        }
        .into_user("u1".to_string(), now);
        user.password_reset_token = Some("digest".to_string());

        let json = serde_json::to_value(user.to_public()).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj["username"], "alice");
        assert_eq!(obj["role"], "admin");
        assert!(obj.contains_key("lastLogin"));
        assert!(!obj.contains_key("passwordHash"));
        assert!(!obj.contains_key("refreshTokens"));
        assert!(!obj.contains_key("passwordResetToken"));
    }

    #[test]
    fn test_role_round_trip() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(Role::User.as_str(), "user");
        assert!("root".parse::<Role>().is_err());
    }
}
