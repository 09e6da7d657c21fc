/// User store contract
use crate::{
    db::account::{NewUser, RefreshTokenEntry, User},
    error::CmsResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Persistence for user records and their refresh-token lists.
///
/// Each mutating call is a single atomic update of one user record. Emails are
/// matched exactly; callers normalize them to lowercase.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> CmsResult<Option<User>>;

    async fn find_by_username(&self, username: &str) -> CmsResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> CmsResult<Option<User>>;

    /// Look up the user holding this reset-token digest, regardless of expiry
    async fn find_by_reset_token(&self, token_hash: &str) -> CmsResult<Option<User>>;

    /// Insert a new user; fails with `Conflict` on a duplicate username or email
    async fn insert(&self, user: NewUser) -> CmsResult<User>;

    async fn record_login(&self, id: &str, at: DateTime<Utc>) -> CmsResult<()>;

    async fn add_refresh_token(&self, id: &str, entry: RefreshTokenEntry) -> CmsResult<()>;

    /// Returns whether the token was present
    async fn remove_refresh_token(&self, id: &str, token: &str) -> CmsResult<bool>;

    async fn set_password_reset(
        &self,
        id: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> CmsResult<()>;

    /// Store the new hash, clear the reset fields and drop every refresh token
    async fn complete_password_reset(&self, id: &str, password_hash: &str) -> CmsResult<()>;

    /// Remove expired refresh tokens and expired reset tokens; returns the number removed
    async fn purge_expired(&self, now: DateTime<Utc>) -> CmsResult<u64>;

    async fn count(&self) -> CmsResult<u64>;
}

/// Behaviour every store must share, run against each implementation
#[cfg(test)]
pub(crate) mod contract {
    use super::*;
    use crate::{
        db::account::{Role, EMAIL_TAKEN, USERNAME_TAKEN},
        error::CmsError,
    };
    use chrono::Duration;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role: Role::Admin,
        }
    }

    fn entry(token: &str, issued: DateTime<Utc>) -> RefreshTokenEntry {
        RefreshTokenEntry {
            token: token.to_string(),
            created_at: issued,
            expires_at: issued + Duration::days(7),
        }
    }

    pub async fn insert_and_lookup(repo: &dyn UserRepository) {
        let user = repo.insert(new_user("alice", "a@x.com")).await.unwrap();
        assert_eq!(user.username, "alice");
        assert!(user.refresh_tokens.is_empty());

        let by_id = repo.find_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "a@x.com");
        assert_eq!(by_id.role, Role::Admin);

        assert!(repo.find_by_username("alice").await.unwrap().is_some());
        assert!(repo.find_by_email("a@x.com").await.unwrap().is_some());
        assert!(repo.find_by_username("bob").await.unwrap().is_none());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    pub async fn duplicate_insert_conflicts(repo: &dyn UserRepository) {
        repo.insert(new_user("alice", "a@x.com")).await.unwrap();

        // Same wording as the manager's own pre-insert checks
        let same_name = repo.insert(new_user("alice", "other@x.com")).await;
        assert!(matches!(same_name, Err(CmsError::Conflict(m)) if m == USERNAME_TAKEN));

        let same_email = repo.insert(new_user("alice2", "a@x.com")).await;
        assert!(matches!(same_email, Err(CmsError::Conflict(m)) if m == EMAIL_TAKEN));
    }

    pub async fn refresh_token_list(repo: &dyn UserRepository) {
        let user = repo.insert(new_user("alice", "a@x.com")).await.unwrap();
        let now = Utc::now();

        repo.add_refresh_token(&user.id, entry("t1", now)).await.unwrap();
        repo.add_refresh_token(&user.id, entry("t2", now)).await.unwrap();

        let stored = repo.find_by_id(&user.id).await.unwrap().unwrap();
        assert!(stored.has_refresh_token("t1"));
        assert!(stored.has_refresh_token("t2"));

        assert!(repo.remove_refresh_token(&user.id, "t1").await.unwrap());
        assert!(!repo.remove_refresh_token(&user.id, "t1").await.unwrap());

        let stored = repo.find_by_id(&user.id).await.unwrap().unwrap();
        assert!(!stored.has_refresh_token("t1"));
        assert!(stored.has_refresh_token("t2"));
    }

    pub async fn password_reset_clears_sessions(repo: &dyn UserRepository) {
        let user = repo.insert(new_user("alice", "a@x.com")).await.unwrap();
        let now = Utc::now();
        repo.add_refresh_token(&user.id, entry("t1", now)).await.unwrap();
        repo.add_refresh_token(&user.id, entry("t2", now)).await.unwrap();

        repo.set_password_reset(&user.id, "digest", now + Duration::hours(1))
            .await
            .unwrap();
        let pending = repo.find_by_reset_token("digest").await.unwrap().unwrap();
        assert_eq!(pending.id, user.id);
        assert!(pending.password_reset_expires.is_some());

        repo.complete_password_reset(&user.id, "new-hash").await.unwrap();

        let done = repo.find_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(done.password_hash, "new-hash");
        assert!(done.refresh_tokens.is_empty());
        assert!(done.password_reset_token.is_none());
        assert!(done.password_reset_expires.is_none());
        assert!(repo.find_by_reset_token("digest").await.unwrap().is_none());
    }

    pub async fn record_login_sets_timestamp(repo: &dyn UserRepository) {
        let user = repo.insert(new_user("alice", "a@x.com")).await.unwrap();
        assert!(user.last_login.is_none());

        repo.record_login(&user.id, Utc::now()).await.unwrap();
        let stored = repo.find_by_id(&user.id).await.unwrap().unwrap();
        assert!(stored.last_login.is_some());

        let missing = repo.record_login("nope", Utc::now()).await;
        assert!(matches!(missing, Err(CmsError::NotFound(_))));
    }

    pub async fn purge_expired_tokens(repo: &dyn UserRepository) {
        let user = repo.insert(new_user("alice", "a@x.com")).await.unwrap();
        let now = Utc::now();

        repo.add_refresh_token(&user.id, entry("old", now - Duration::days(8)))
            .await
            .unwrap();
        repo.add_refresh_token(&user.id, entry("fresh", now)).await.unwrap();
        repo.set_password_reset(&user.id, "digest", now - Duration::minutes(1))
            .await
            .unwrap();

        let removed = repo.purge_expired(now).await.unwrap();
        assert_eq!(removed, 2);

        let stored = repo.find_by_id(&user.id).await.unwrap().unwrap();
        assert!(!stored.has_refresh_token("old"));
        assert!(stored.has_refresh_token("fresh"));
        assert!(stored.password_reset_token.is_none());
    }
}
