//! Downloaded item records.

use crate::error::DatabaseError;
use crate::remote::RecordStore;
use crate::{Error, Result};
use async_trait::async_trait;

use super::{Database, DownloadRecord};

impl Database {
    /// Check whether an item has been recorded as downloaded
    pub async fn is_item_recorded(&self, item_id: &str) -> Result<bool> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM downloaded_items WHERE item_id = ?")
                .bind(item_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to check item record: {}",
                        e
                    )))
                })?;

        Ok(found.is_some())
    }

    /// Record an item as downloaded
    ///
    /// Recording the same item twice keeps the first timestamp.
    pub async fn record_item(&self, item_id: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO downloaded_items (item_id, recorded_at)
            VALUES (?, ?)
            ON CONFLICT(item_id) DO NOTHING
            "#,
        )
        .bind(item_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to record item: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Forget an item so the next batch downloads it again
    ///
    /// Returns whether a record was removed.
    pub async fn remove_item_record(&self, item_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM downloaded_items WHERE item_id = ?")
            .bind(item_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to remove item record: {}",
                    e
                )))
            })?;

        Ok(result.rows_affected() > 0)
    }

    /// List recorded items, newest first
    pub async fn list_item_records(&self, limit: i64) -> Result<Vec<DownloadRecord>> {
        sqlx::query_as::<_, DownloadRecord>(
            r#"
            SELECT item_id, recorded_at FROM downloaded_items
            ORDER BY recorded_at DESC, item_id
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list item records: {}",
                e
            )))
        })
    }
}

#[async_trait]
impl RecordStore for Database {
    async fn exists(&self, item_id: &str) -> Result<bool> {
        self.is_item_recorded(item_id).await
    }

    async fn record(&self, item_id: &str) -> Result<()> {
        self.record_item(item_id).await
    }
}
