/// SQLite-backed user store using runtime queries
use crate::{
    account::repository::UserRepository,
    db::account::{NewUser, RefreshTokenEntry, Role, User, EMAIL_TAKEN, USERNAME_TAKEN},
    error::{CmsError, CmsResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, username, email, password_hash, role, password_reset_token, \
     password_reset_expires, last_login, created_at, updated_at";

/// User store over the `users` and `refresh_tokens` tables
#[derive(Clone)]
pub struct SqliteUserStore {
    db: SqlitePool,
}

impl SqliteUserStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Fetch one user by an arbitrary column and attach its refresh tokens
    async fn find_one(&self, column: &str, value: &str) -> CmsResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE {} = ?1", USER_COLUMNS, column);
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.db)
            .await?;

        match row {
            Some(row) => {
                let mut user = user_from_row(&row)?;
                user.refresh_tokens = self.load_refresh_tokens(&user.id).await?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    async fn load_refresh_tokens(&self, user_id: &str) -> CmsResult<Vec<RefreshTokenEntry>> {
        let rows = sqlx::query(
            "SELECT token, created_at, expires_at FROM refresh_tokens
             WHERE user_id = ?1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        let mut tokens = Vec::with_capacity(rows.len());
        for row in rows {
            tokens.push(RefreshTokenEntry {
                token: row.try_get("token")?,
                created_at: row.try_get("created_at")?,
                expires_at: row.try_get("expires_at")?,
            });
        }
        Ok(tokens)
    }

    async fn ensure_exists(&self, id: &str) -> CmsResult<()> {
        let exists: Option<String> = sqlx::query_scalar("SELECT id FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        exists
            .map(|_| ())
            .ok_or_else(|| CmsError::NotFound(format!("User {} not found", id)))
    }
}

fn user_from_row(row: &SqliteRow) -> CmsResult<User> {
    let role: String = row.try_get("role")?;

    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        role: role.parse::<Role>()?,
        refresh_tokens: Vec::new(),
        password_reset_token: row.try_get("password_reset_token")?,
        password_reset_expires: row.try_get("password_reset_expires")?,
        last_login: row.try_get("last_login")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Translate a unique-constraint failure into a conflict naming the field
fn map_insert_error(e: sqlx::Error) -> CmsError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            let message = if db_err.message().contains("users.email") {
                EMAIL_TAKEN
            } else {
                USERNAME_TAKEN
            };
            return CmsError::Conflict(message.to_string());
        }
    }
    CmsError::Database(e)
}

#[async_trait]
impl UserRepository for SqliteUserStore {
    async fn find_by_id(&self, id: &str) -> CmsResult<Option<User>> {
        self.find_one("id", id).await
    }

    async fn find_by_username(&self, username: &str) -> CmsResult<Option<User>> {
        self.find_one("username", username).await
    }

    async fn find_by_email(&self, email: &str) -> CmsResult<Option<User>> {
        self.find_one("email", email).await
    }

    async fn find_by_reset_token(&self, token_hash: &str) -> CmsResult<Option<User>> {
        self.find_one("password_reset_token", token_hash).await
    }

    async fn insert(&self, user: NewUser) -> CmsResult<User> {
        let user = user.into_user(Uuid::new_v4().to_string(), Utc::now());

        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, role, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.db)
        .await
        .map_err(map_insert_error)?;

        Ok(user)
    }

    async fn record_login(&self, id: &str, at: DateTime<Utc>) -> CmsResult<()> {
        let result = sqlx::query("UPDATE users SET last_login = ?1, updated_at = ?1 WHERE id = ?2")
            .bind(at)
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CmsError::NotFound(format!("User {} not found", id)));
        }
        Ok(())
    }

    async fn add_refresh_token(&self, id: &str, entry: RefreshTokenEntry) -> CmsResult<()> {
        self.ensure_exists(id).await?;

        sqlx::query(
            "INSERT INTO refresh_tokens (token, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&entry.token)
        .bind(id)
        .bind(entry.created_at)
        .bind(entry.expires_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn remove_refresh_token(&self, id: &str, token: &str) -> CmsResult<bool> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ?1 AND token = ?2")
            .bind(id)
            .bind(token)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_password_reset(
        &self,
        id: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> CmsResult<()> {
        let result = sqlx::query(
            "UPDATE users SET password_reset_token = ?1, password_reset_expires = ?2, updated_at = ?3
             WHERE id = ?4",
        )
        .bind(token_hash)
        .bind(expires_at)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CmsError::NotFound(format!("User {} not found", id)));
        }
        Ok(())
    }

    async fn complete_password_reset(&self, id: &str, password_hash: &str) -> CmsResult<()> {
        let mut tx = self.db.begin().await?;

        let result = sqlx::query(
            "UPDATE users SET password_hash = ?1, password_reset_token = NULL,
             password_reset_expires = NULL, updated_at = ?2 WHERE id = ?3",
        )
        .bind(password_hash)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CmsError::NotFound(format!("User {} not found", id)));
        }

        sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> CmsResult<u64> {
        let mut tx = self.db.begin().await?;

        let tokens = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= ?1")
            .bind(now)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let resets = sqlx::query(
            "UPDATE users SET password_reset_token = NULL, password_reset_expires = NULL
             WHERE password_reset_expires IS NOT NULL AND password_reset_expires <= ?1",
        )
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;
        Ok(tokens + resets)
    }

    async fn count(&self) -> CmsResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db)
            .await?;
        Ok(count as u64)
    }
}
