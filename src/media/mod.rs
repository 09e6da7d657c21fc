/// Disk storage for uploaded images
///
/// Files live flat in one directory and are served back under `/uploads`.
/// Stored names are generated here; client-supplied names only contribute
/// their extension.
use crate::{
    config::MediaConfig,
    error::{CmsError, CmsResult},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Public path prefix for stored files
pub const PUBLIC_PREFIX: &str = "/uploads";

/// A file accepted by an upload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub id: String,
    pub original_name: String,
    pub filename: String,
    pub path: String,
    pub mimetype: String,
    pub size: u64,
    pub upload_date: DateTime<Utc>,
}

/// A file found in the upload directory
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub id: String,
    pub filename: String,
    pub path: String,
    pub size: u64,
    pub upload_date: DateTime<Utc>,
}

#[derive(Clone)]
pub struct MediaStore {
    dir: PathBuf,
    max_file_bytes: usize,
}

impl MediaStore {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            dir: config.upload_dir.clone(),
            max_file_bytes: config.max_file_bytes,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_file_bytes(&self) -> usize {
        self.max_file_bytes
    }

    /// Reject anything that is not an image before reading the body
    pub fn check_mimetype(mimetype: &str) -> CmsResult<()> {
        if mimetype.starts_with("image/") {
            Ok(())
        } else {
            Err(CmsError::Validation("Only image files are allowed".to_string()))
        }
    }

    /// `<field>-<millis>-<random><.ext>`
    fn generate_name(field: &str, original_name: &str) -> String {
        let ext = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|e| format!(".{}", e.to_ascii_lowercase()))
            .unwrap_or_default();
        let field: String = field
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        let field = if field.is_empty() { "file".to_string() } else { field };

        format!(
            "{}-{}-{}{}",
            field,
            Utc::now().timestamp_millis(),
            rand::random::<u32>() % 1_000_000_000,
            ext
        )
    }

    /// Write one image under a fresh name
    pub async fn save(
        &self,
        field: &str,
        original_name: &str,
        mimetype: &str,
        data: &[u8],
    ) -> CmsResult<UploadedFile> {
        Self::check_mimetype(mimetype)?;
        if data.len() > self.max_file_bytes {
            return Err(self.too_large());
        }

        fs::create_dir_all(&self.dir).await?;
        let filename = Self::generate_name(field, original_name);
        fs::write(self.dir.join(&filename), data).await?;

        tracing::debug!("Stored upload {} ({} bytes)", filename, data.len());

        Ok(UploadedFile {
            id: filename.clone(),
            original_name: original_name.to_string(),
            path: format!("{}/{}", PUBLIC_PREFIX, filename),
            filename,
            mimetype: mimetype.to_string(),
            size: data.len() as u64,
            upload_date: Utc::now(),
        })
    }

    pub fn too_large(&self) -> CmsError {
        CmsError::Validation(format!(
            "File too large, maximum size is {} bytes",
            self.max_file_bytes
        ))
    }

    /// Every visible file, newest first
    pub async fn list(&self) -> CmsResult<Vec<StoredFile>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let Ok(filename) = entry.file_name().into_string() else {
                continue;
            };
            if filename.starts_with('.') {
                continue;
            }
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let stamp = metadata.created().or_else(|_| metadata.modified())?;

            files.push(StoredFile {
                id: filename.clone(),
                path: format!("{}/{}", PUBLIC_PREFIX, filename),
                filename,
                size: metadata.len(),
                upload_date: DateTime::<Utc>::from(stamp),
            });
        }

        files.sort_by(|a, b| b.upload_date.cmp(&a.upload_date));
        Ok(files)
    }

    /// Remove a file by its stored name; false if there was none
    pub async fn delete(&self, filename: &str) -> CmsResult<bool> {
        if !is_plain_name(filename) {
            return Ok(false);
        }

        match fs::remove_file(self.dir.join(filename)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// A single visible path component
fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && !name.contains("..")
}
