/// Configuration management for the Ecosystem CMS backend
use crate::{
    db::account::Role,
    error::{CmsError, CmsResult},
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub email: Option<EmailConfig>,
    pub rate_limit: RateLimitConfig,
    pub bootstrap: Option<BootstrapAdminConfig>,
    pub logging: LoggingConfig,
    pub media: MediaConfig,
}

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = CmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(CmsError::Validation(format!("Unknown environment: {}", other))),
        }
    }
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub environment: Environment,
    /// Allowed browser origin in production; any origin is allowed in development
    pub cors_origin: Option<String>,
    /// Base URL used in links sent by email
    pub public_url: String,
    /// Honour `X-Forwarded-For` from a reverse proxy when keying rate limits
    pub trust_proxy: bool,
}

/// Where user records and content documents live
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StorageConfig {
    Sqlite { path: PathBuf },
    Memory,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
    pub reset_token_ttl_secs: i64,
    /// Role granted to self-registered users
    pub registration_default_role: Role,
}

/// Email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_url: String,
    pub from_address: String,
}

/// One fixed window: at most `max_requests` per `window` per request source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowRule {
    pub window: Duration,
    pub max_requests: u32,
    /// Responses with a 2xx status give their slot back
    pub skip_successful: bool,
    pub message: String,
}

/// Per-endpoint-class limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitRules {
    pub api: WindowRule,
    pub login: WindowRule,
    pub register: WindowRule,
    pub password_reset: WindowRule,
}

impl Default for RateLimitRules {
    fn default() -> Self {
        Self {
            api: WindowRule {
                window: Duration::from_secs(15 * 60),
                max_requests: 100,
                skip_successful: false,
                message: "Too many requests from this address, please try again later".to_string(),
            },
            login: WindowRule {
                window: Duration::from_secs(15 * 60),
                max_requests: 5,
                skip_successful: true,
                message: "Too many login attempts, please try again in 15 minutes".to_string(),
            },
            register: WindowRule {
                window: Duration::from_secs(60 * 60),
                max_requests: 3,
                skip_successful: false,
                message: "Too many registrations from this address".to_string(),
            },
            password_reset: WindowRule {
                window: Duration::from_secs(60 * 60),
                max_requests: 3,
                skip_successful: false,
                message: "Too many password reset attempts".to_string(),
            },
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Process-wide ceiling across all sources
    pub global_requests_per_minute: u32,
    pub rules: RateLimitRules,
}

/// Initial admin account created at startup when absent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapAdminConfig {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Uploaded image storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Directory holding uploads, served under `/uploads`
    pub upload_dir: PathBuf,
    pub max_file_bytes: usize,
    /// Most files accepted by one multi-file upload
    pub max_files: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> CmsResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("CMS_HOSTNAME").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("CMS_PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse()
            .map_err(|_| CmsError::Validation("Invalid port number".to_string()))?;
        let environment = env::var("CMS_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .parse()?;
        let cors_origin = env::var("CMS_CORS_ORIGIN").ok();
        let public_url = env::var("CMS_PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}", port));

        let storage = match env::var("CMS_STORAGE")
            .unwrap_or_else(|_| "sqlite".to_string())
            .as_str()
        {
            "memory" => StorageConfig::Memory,
            "sqlite" => StorageConfig::Sqlite {
                path: env::var("CMS_DATABASE_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("./data/ecosystem.sqlite")),
            },
            other => {
                return Err(CmsError::Validation(format!(
                    "Unknown storage backend: {}",
                    other
                )))
            }
        };

        let jwt_secret = env::var("CMS_JWT_SECRET")
            .map_err(|_| CmsError::Validation("JWT secret required".to_string()))?;
        let registration_default_role = env::var("CMS_REGISTRATION_DEFAULT_ROLE")
            .unwrap_or_else(|_| "admin".to_string())
            .parse()?;

        let email = if let Ok(smtp_url) = env::var("CMS_EMAIL_SMTP_URL") {
            Some(EmailConfig {
                smtp_url,
                from_address: env::var("CMS_EMAIL_FROM_ADDRESS")
                    .unwrap_or_else(|_| format!("noreply@{}", hostname)),
            })
        } else {
            None
        };

        let bootstrap = match (
            env::var("CMS_ADMIN_USERNAME"),
            env::var("CMS_ADMIN_EMAIL"),
            env::var("CMS_ADMIN_PASSWORD"),
        ) {
            (Ok(username), Ok(email), Ok(password)) => Some(BootstrapAdminConfig {
                username,
                email,
                password,
            }),
            _ => None,
        };

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                environment,
                cors_origin,
                public_url,
                trust_proxy: env_or("CMS_TRUST_PROXY", false),
            },
            storage,
            authentication: AuthConfig {
                jwt_secret,
                access_token_ttl_secs: env_or("CMS_ACCESS_TOKEN_TTL_SECS", 24 * 3600),
                refresh_token_ttl_secs: env_or("CMS_REFRESH_TOKEN_TTL_SECS", 7 * 24 * 3600),
                reset_token_ttl_secs: env_or("CMS_RESET_TOKEN_TTL_SECS", 3600),
                registration_default_role,
            },
            email,
            rate_limit: RateLimitConfig {
                enabled: env_or("CMS_RATE_LIMITS_ENABLED", true),
                global_requests_per_minute: env_or(
                    "CMS_RATE_LIMIT_GLOBAL_REQUESTS_PER_MINUTE",
                    3000,
                ),
                rules: RateLimitRules::default(),
            },
            bootstrap,
            logging: LoggingConfig {
                level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            },
            media: MediaConfig {
                upload_dir: env::var("CMS_UPLOAD_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("./uploads")),
                max_file_bytes: env_or("CMS_UPLOAD_MAX_FILE_BYTES", 5 * 1024 * 1024),
                max_files: 10,
            },
        })
    }

    /// Development defaults with in-memory storage
    pub fn development(jwt_secret: impl Into<String>) -> Self {
        ServerConfig {
            service: ServiceConfig {
                hostname: "127.0.0.1".to_string(),
                port: 5000,
                environment: Environment::Development,
                cors_origin: None,
                public_url: "http://localhost:5000".to_string(),
                trust_proxy: false,
            },
            storage: StorageConfig::Memory,
            authentication: AuthConfig {
                jwt_secret: jwt_secret.into(),
                access_token_ttl_secs: 24 * 3600,
                refresh_token_ttl_secs: 7 * 24 * 3600,
                reset_token_ttl_secs: 3600,
                registration_default_role: Role::Admin,
            },
            email: None,
            rate_limit: RateLimitConfig {
                enabled: true,
                global_requests_per_minute: 3000,
                rules: RateLimitRules::default(),
            },
            bootstrap: None,
            logging: LoggingConfig {
                level: "debug".to_string(),
            },
            media: MediaConfig {
                upload_dir: PathBuf::from("./uploads"),
                max_file_bytes: 5 * 1024 * 1024,
                max_files: 10,
            },
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> CmsResult<()> {
        if self.service.hostname.is_empty() {
            return Err(CmsError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(CmsError::Validation(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if self.authentication.access_token_ttl_secs <= 0
            || self.authentication.refresh_token_ttl_secs <= 0
            || self.authentication.reset_token_ttl_secs <= 0
        {
            return Err(CmsError::Validation(
                "Token lifetimes must be positive".to_string(),
            ));
        }

        if self.media.max_file_bytes == 0 || self.media.max_files == 0 {
            return Err(CmsError::Validation(
                "Upload limits must be positive".to_string(),
            ));
        }

        if self.service.environment == Environment::Production && self.service.cors_origin.is_none()
        {
            return Err(CmsError::Validation(
                "CMS_CORS_ORIGIN is required in production".to_string(),
            ));
        }

        Ok(())
    }

    pub fn is_development(&self) -> bool {
        self.service.environment == Environment::Development
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-for-testing-only-0123456789";

    #[test]
    fn test_development_defaults() {
        let config = ServerConfig::development(SECRET);
        assert!(config.validate().is_ok());
        assert!(config.is_development());
        assert_eq!(config.authentication.access_token_ttl_secs, 86400);
        assert_eq!(config.authentication.refresh_token_ttl_secs, 604800);
        assert_eq!(config.authentication.registration_default_role, Role::Admin);
        assert_eq!(config.rate_limit.rules.login.max_requests, 5);
        assert!(config.rate_limit.rules.login.skip_successful);
        assert_eq!(config.rate_limit.rules.register.window, Duration::from_secs(3600));
        assert!(!config.service.trust_proxy);
        assert_eq!(config.media.max_file_bytes, 5 * 1024 * 1024);
        assert_eq!(config.media.max_files, 10);
    }

    #[test]
    fn test_short_secret_rejected() {
        let config = ServerConfig::development("too-short");
        assert!(matches!(config.validate(), Err(CmsError::Validation(_))));
    }

    #[test]
    fn test_production_requires_cors_origin() {
        let mut config = ServerConfig::development(SECRET);
        config.service.environment = Environment::Production;
        assert!(config.validate().is_err());

        config.service.cors_origin = Some("https://ecosystem-pbs.ru".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!(
            "Development".parse::<Environment>().unwrap(),
            Environment::Development
        );
        assert!("staging".parse::<Environment>().is_err());
    }
}
