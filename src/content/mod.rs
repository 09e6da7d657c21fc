/// Content store
///
/// Documents of every collection live as JSON bodies in one SQLite table,
/// keyed by (collection, id). Filtering and ordering happen in the API layer.
pub mod models;

use crate::error::{CmsError, CmsResult};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;
use validator::Validate;

/// Keys owned by the store itself
const RESERVED_FIELDS: &[&str] = &["id", "createdAt", "updatedAt"];

/// A kind of content document
pub trait Document: Serialize + DeserializeOwned + Validate + Send + Sync + 'static {
    /// Collection name stored alongside each document
    const COLLECTION: &'static str;
    /// Human-readable name used in messages
    const LABEL: &'static str;
    /// Fields set by the server; updates cannot change them
    const SERVER_FIELDS: &'static [&'static str] = &[];

    /// Canonicalize user input before validation
    fn normalize(&mut self) {}
}

/// Document together with its store-managed metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stored<T> {
    pub id: String,
    #[serde(flatten)]
    pub doc: T,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parse, normalize and validate a client payload
pub fn parse_document<T: Document>(value: Value) -> CmsResult<T> {
    let mut doc: T = serde_json::from_value(value)
        .map_err(|e| CmsError::Validation(format!("Invalid {}: {}", T::LABEL, e)))?;
    doc.normalize();
    doc.validate()?;
    Ok(doc)
}

/// Overlay `patch` on `base`, skipping reserved and server-owned keys
fn merge_patch(base: &mut Map<String, Value>, patch: Value, protected: &[&str]) -> CmsResult<()> {
    let Value::Object(patch) = patch else {
        return Err(CmsError::Validation(
            "Update body must be a JSON object".to_string(),
        ));
    };

    for (key, value) in patch {
        if RESERVED_FIELDS.contains(&key.as_str()) || protected.contains(&key.as_str()) {
            continue;
        }
        base.insert(key, value);
    }
    Ok(())
}

fn stored_from_row<T: Document>(row: &SqliteRow) -> CmsResult<Stored<T>> {
    let body: String = row.try_get("body")?;
    Ok(Stored {
        id: row.try_get("id")?,
        doc: serde_json::from_str(&body)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// JSON document store over `content_items`
#[derive(Clone)]
pub struct ContentStore {
    db: SqlitePool,
}

impl ContentStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// All documents of a collection, newest first
    pub async fn list<T: Document>(&self) -> CmsResult<Vec<Stored<T>>> {
        let rows = sqlx::query(
            "SELECT id, body, created_at, updated_at FROM content_items
             WHERE collection = ?1 ORDER BY created_at DESC",
        )
        .bind(T::COLLECTION)
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(stored_from_row::<T>).collect()
    }

    pub async fn get<T: Document>(&self, id: &str) -> CmsResult<Option<Stored<T>>> {
        let row = sqlx::query(
            "SELECT id, body, created_at, updated_at FROM content_items
             WHERE collection = ?1 AND id = ?2",
        )
        .bind(T::COLLECTION)
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        row.as_ref().map(stored_from_row::<T>).transpose()
    }

    /// First document matching `pred`
    pub async fn find<T: Document>(
        &self,
        pred: impl Fn(&T) -> bool + Send,
    ) -> CmsResult<Option<Stored<T>>> {
        Ok(self.list::<T>().await?.into_iter().find(|s| pred(&s.doc)))
    }

    /// Validate and store a new document
    pub async fn insert<T: Document>(&self, mut doc: T) -> CmsResult<Stored<T>> {
        doc.normalize();
        doc.validate()?;

        let now = Utc::now();
        let stored = Stored {
            id: Uuid::new_v4().to_string(),
            doc,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO content_items (collection, id, body, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(T::COLLECTION)
        .bind(&stored.id)
        .bind(serde_json::to_string(&stored.doc)?)
        .bind(stored.created_at)
        .bind(stored.updated_at)
        .execute(&self.db)
        .await?;

        tracing::debug!("Created {} {}", T::COLLECTION, stored.id);
        Ok(stored)
    }

    /// Write back a document loaded from the store
    pub async fn save<T: Document>(&self, stored: &mut Stored<T>) -> CmsResult<()> {
        stored.updated_at = Utc::now();

        let result = sqlx::query(
            "UPDATE content_items SET body = ?1, updated_at = ?2
             WHERE collection = ?3 AND id = ?4",
        )
        .bind(serde_json::to_string(&stored.doc)?)
        .bind(stored.updated_at)
        .bind(T::COLLECTION)
        .bind(&stored.id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CmsError::NotFound(format!("{} not found", T::LABEL)));
        }
        Ok(())
    }

    /// Apply a partial JSON update and re-validate the whole document
    ///
    /// Returns `None` when the id is unknown.
    pub async fn patch<T: Document>(
        &self,
        id: &str,
        patch: Value,
    ) -> CmsResult<Option<Stored<T>>> {
        let Some(current) = self.get::<T>(id).await? else {
            return Ok(None);
        };

        let Value::Object(mut body) = serde_json::to_value(&current.doc)? else {
            return Err(CmsError::Internal(format!(
                "{} {} is not a JSON object",
                T::LABEL,
                id
            )));
        };
        merge_patch(&mut body, patch, T::SERVER_FIELDS)?;

        let mut updated = Stored {
            id: current.id,
            doc: parse_document::<T>(Value::Object(body))?,
            created_at: current.created_at,
            updated_at: current.updated_at,
        };
        self.save(&mut updated).await?;

        Ok(Some(updated))
    }

    /// Returns whether a document was removed
    pub async fn delete<T: Document>(&self, id: &str) -> CmsResult<bool> {
        let result = sqlx::query("DELETE FROM content_items WHERE collection = ?1 AND id = ?2")
            .bind(T::COLLECTION)
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
