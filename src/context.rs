/// Application context and dependency injection
use crate::{
    account::{InMemoryUserStore, SessionManager, TokenService, UserRepository},
    config::{ServerConfig, StorageConfig},
    content::ContentStore,
    db::{self, SqliteUserStore},
    error::CmsResult,
    mailer::Mailer,
    media::MediaStore,
    rate_limit::RateLimiter,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub users: Arc<dyn UserRepository>,
    pub tokens: Arc<TokenService>,
    pub sessions: Arc<SessionManager>,
    pub content: Arc<ContentStore>,
    pub rate_limiter: Arc<RateLimiter>,
    pub mailer: Arc<Mailer>,
    pub media: Arc<MediaStore>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> CmsResult<Self> {
        config.validate()?;

        // Content always lives in SQLite; users follow the configured backend
        let (db, users): (SqlitePool, Arc<dyn UserRepository>) = match &config.storage {
            StorageConfig::Sqlite { path } => {
                let pool = db::create_pool(path, db::DatabaseOptions::default()).await?;
                tracing::info!("Using SQLite storage at {}", path.display());
                (pool.clone(), Arc::new(SqliteUserStore::new(pool)))
            }
            StorageConfig::Memory => {
                let pool = db::create_memory_pool().await?;
                tracing::info!("Using in-memory storage");
                (pool, Arc::new(InMemoryUserStore::new()))
            }
        };

        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        let config = Arc::new(config);
        let tokens = Arc::new(TokenService::from_config(&config.authentication));
        let sessions = Arc::new(SessionManager::new(
            users.clone(),
            tokens.clone(),
            config.clone(),
        ));
        let content = Arc::new(ContentStore::new(db.clone()));
        let rate_limiter = Arc::new(RateLimiter::new(&config.rate_limit));
        let mailer = Arc::new(Mailer::new(config.email.clone())?);
        let media = Arc::new(MediaStore::new(&config.media));

        Ok(Self {
            config,
            db,
            users,
            tokens,
            sessions,
            content,
            rate_limiter,
            mailer,
            media,
        })
    }

    /// Create the bootstrap admin account if one is configured
    pub async fn bootstrap_admin(&self) -> CmsResult<()> {
        if let Some(admin) = &self.config.bootstrap {
            self.sessions.ensure_admin(admin).await?;
        }
        Ok(())
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
