/// Persistent backing for the client session cache
use crate::{client::ClientError, db::account::PublicUser};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::RwLock;

/// What survives a restart of the client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    pub user: Option<PublicUser>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl StoredSession {
    pub fn is_empty(&self) -> bool {
        self.user.is_none() && self.access_token.is_none() && self.refresh_token.is_none()
    }
}

#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Empty session when nothing has been saved
    async fn load(&self) -> Result<StoredSession, ClientError>;

    async fn save(&self, session: &StoredSession) -> Result<(), ClientError>;

    async fn clear(&self) -> Result<(), ClientError>;
}

/// Session kept only for the life of the process
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    session: RwLock<StoredSession>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: StoredSession) -> Self {
        Self {
            session: RwLock::new(session),
        }
    }
}

#[async_trait]
impl SessionStorage for MemorySessionStorage {
    async fn load(&self) -> Result<StoredSession, ClientError> {
        Ok(self.session.read().await.clone())
    }

    async fn save(&self, session: &StoredSession) -> Result<(), ClientError> {
        *self.session.write().await = session.clone();
        Ok(())
    }

    async fn clear(&self) -> Result<(), ClientError> {
        *self.session.write().await = StoredSession::default();
        Ok(())
    }
}

/// Session stored as a JSON file
#[derive(Debug, Clone)]
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl SessionStorage for FileSessionStorage {
    async fn load(&self) -> Result<StoredSession, ClientError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoredSession::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, session: &StoredSession) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        // Write then rename so a crash never leaves half a file
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(session)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), ClientError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
