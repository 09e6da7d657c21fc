/// In-memory user store
use crate::{
    account::repository::UserRepository,
    db::account::{NewUser, RefreshTokenEntry, User, EMAIL_TAKEN, USERNAME_TAKEN},
    error::{CmsError, CmsResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// User store kept in process memory, keyed by user id
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `f` to one user under the write lock
    async fn update<T>(&self, id: &str, f: impl FnOnce(&mut User) -> T) -> CmsResult<T> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(id)
            .ok_or_else(|| CmsError::NotFound(format!("User {} not found", id)))?;
        Ok(f(user))
    }

    async fn find(&self, pred: impl Fn(&User) -> bool) -> CmsResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| pred(u)).cloned())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserStore {
    async fn find_by_id(&self, id: &str) -> CmsResult<Option<User>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> CmsResult<Option<User>> {
        self.find(|u| u.username == username).await
    }

    async fn find_by_email(&self, email: &str) -> CmsResult<Option<User>> {
        self.find(|u| u.email == email).await
    }

    async fn find_by_reset_token(&self, token_hash: &str) -> CmsResult<Option<User>> {
        self.find(|u| u.password_reset_token.as_deref() == Some(token_hash))
            .await
    }

    async fn insert(&self, user: NewUser) -> CmsResult<User> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.username == user.username) {
            return Err(CmsError::Conflict(USERNAME_TAKEN.to_string()));
        }
        if users.values().any(|u| u.email == user.email) {
            return Err(CmsError::Conflict(EMAIL_TAKEN.to_string()));
        }

        let user = user.into_user(Uuid::new_v4().to_string(), Utc::now());
        users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn record_login(&self, id: &str, at: DateTime<Utc>) -> CmsResult<()> {
        self.update(id, |user| {
            user.last_login = Some(at);
            user.updated_at = at;
        })
        .await
    }

    async fn add_refresh_token(&self, id: &str, entry: RefreshTokenEntry) -> CmsResult<()> {
        self.update(id, |user| user.refresh_tokens.push(entry)).await
    }

    async fn remove_refresh_token(&self, id: &str, token: &str) -> CmsResult<bool> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(id) else {
            return Ok(false);
        };

        let before = user.refresh_tokens.len();
        user.refresh_tokens.retain(|rt| rt.token != token);
        Ok(user.refresh_tokens.len() < before)
    }

    async fn set_password_reset(
        &self,
        id: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> CmsResult<()> {
        self.update(id, |user| {
            user.password_reset_token = Some(token_hash.to_string());
            user.password_reset_expires = Some(expires_at);
            user.updated_at = Utc::now();
        })
        .await
    }

    async fn complete_password_reset(&self, id: &str, password_hash: &str) -> CmsResult<()> {
        self.update(id, |user| {
            user.password_hash = password_hash.to_string();
            user.password_reset_token = None;
            user.password_reset_expires = None;
            user.refresh_tokens.clear();
            user.updated_at = Utc::now();
        })
        .await
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> CmsResult<u64> {
        let mut users = self.users.write().await;
        let mut removed = 0u64;

        for user in users.values_mut() {
            let before = user.refresh_tokens.len();
            user.refresh_tokens.retain(|rt| rt.expires_at > now);
            removed += (before - user.refresh_tokens.len()) as u64;

            if matches!(user.password_reset_expires, Some(exp) if exp <= now) {
                user.password_reset_token = None;
                user.password_reset_expires = None;
                removed += 1;
            }
        }

        Ok(removed)
    }

    async fn count(&self) -> CmsResult<u64> {
        Ok(self.users.read().await.len() as u64)
    }
}
