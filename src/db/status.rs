//! Per-record download status (one row per record, upserted).

use async_trait::async_trait;

use crate::store::StatusStore;
use crate::types::{DownloadStatus, RecordId};
use crate::{Error, Result};

use super::{Database, StatusRow};

#[async_trait]
impl StatusStore for Database {
    async fn get(&self, id: RecordId) -> Result<Option<DownloadStatus>> {
        let row = sqlx::query_as::<_, StatusRow>(
            r#"
            SELECT record_id, document_done, address_done, updated_at
            FROM download_status
            WHERE record_id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(row.map(DownloadStatus::from))
    }

    async fn upsert(&self, id: RecordId, document_done: bool, address_done: bool) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO download_status (record_id, document_done, address_done, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(record_id) DO UPDATE SET
                document_done = excluded.document_done,
                address_done = excluded.address_done,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(id)
        .bind(document_done as i32)
        .bind(address_done as i32)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(())
    }
}
