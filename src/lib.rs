//! Ecosystem CMS
//!
//! Backend for the Ecosystem organization website: JWT sessions for the admin
//! panel, site content management, and a client-side session cache for
//! programs that talk to the API.

pub mod account;
pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod content;
pub mod context;
pub mod crypto;
pub mod db;
pub mod error;
pub mod jobs;
pub mod mailer;
pub mod media;
pub mod rate_limit;
pub mod server;
pub mod validation;

pub use config::ServerConfig;
pub use context::AppContext;
pub use error::{CmsError, CmsResult};
