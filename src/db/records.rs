//! Source record queries: seeding, paging, listing and coverage.

use async_trait::async_trait;

use crate::store::RecordSource;
use crate::types::{CoverageSummary, Record, RecordId, RecordPage, RecordView, SortOrder};
use crate::{Error, Result};

use super::{Database, ELIGIBLE_PREDICATE, RecordRow};

/// Default rows per page for [`Database::list_records`]
pub const DEFAULT_PER_PAGE: u32 = 20;
/// Largest accepted rows per page for [`Database::list_records`]
pub const MAX_PER_PAGE: u32 = 100;

const RECORD_COLUMNS: &str = "id, group_key, document_ref, address_ref, phone, email, \
     first_name, last_name, patronymic, document_number";

impl Database {
    /// Insert a source record
    ///
    /// A record with id `0` gets the next free id assigned.
    pub async fn insert_record(&self, record: &Record) -> Result<RecordId> {
        let id = (record.id.get() != 0).then_some(record.id.get());
        let result = sqlx::query(
            r#"
            INSERT INTO records (
                id, group_key, document_ref, address_ref, phone, email,
                first_name, last_name, patronymic, document_number
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(&record.group_key)
        .bind(&record.document_ref)
        .bind(&record.address_ref)
        .bind(&record.phone)
        .bind(&record.email)
        .bind(&record.first_name)
        .bind(&record.last_name)
        .bind(&record.patronymic)
        .bind(&record.document_number)
        .execute(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(RecordId(result.last_insert_rowid()))
    }

    /// One page of eligible records joined with their status flags
    ///
    /// `page` is 1-based and clamped to at least 1; `per_page` outside
    /// `1..=MAX_PER_PAGE` falls back to [`DEFAULT_PER_PAGE`].
    pub async fn list_records(
        &self,
        page: u32,
        per_page: u32,
        sort_order: SortOrder,
    ) -> Result<RecordPage> {
        let page = page.max(1);
        let per_page = if (1..=MAX_PER_PAGE).contains(&per_page) {
            per_page
        } else {
            DEFAULT_PER_PAGE
        };
        let offset = (i64::from(page) - 1) * i64::from(per_page);

        let total = self.count_eligible().await?;

        let direction = match sort_order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        let query = format!(
            r#"
            SELECT r.id, r.group_key, r.document_ref, r.address_ref,
                   COALESCE(s.document_done, 0), COALESCE(s.address_done, 0)
            FROM records r
            LEFT JOIN download_status s ON s.record_id = r.id
            WHERE {ELIGIBLE_PREDICATE}
            ORDER BY r.id {direction}
            LIMIT ? OFFSET ?
            "#
        );

        type ViewRow = (
            i64,
            Option<String>,
            Option<String>,
            Option<String>,
            i32,
            i32,
        );
        let rows: Vec<ViewRow> = sqlx::query_as(&query)
            .bind(i64::from(per_page))
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Sqlx)?;

        let data = rows
            .into_iter()
            .map(
                |(id, group_key, document_ref, address_ref, document_done, address_done)| {
                    RecordView {
                        record_id: RecordId(id),
                        group_key: group_key.unwrap_or_default(),
                        document: document_done != 0,
                        address: address_done != 0,
                        document_files: document_ref.unwrap_or_default(),
                        address_files: address_ref.unwrap_or_default(),
                    }
                },
            )
            .collect();

        let total_pages = if total <= 0 {
            0
        } else {
            u32::try_from((total + i64::from(per_page) - 1) / i64::from(per_page))
                .unwrap_or(u32::MAX)
        };

        Ok(RecordPage {
            data,
            total,
            page,
            per_page,
            total_pages,
            sort_order,
        })
    }

    /// How many eligible records are fully, partially, or not yet downloaded
    ///
    /// A record is fully downloaded when every kind it references is done.
    /// Done flags for kinds a record does not reference are ignored.
    pub async fn coverage_summary(&self) -> Result<CoverageSummary> {
        let query = format!(
            r#"
            WITH eligible AS (
                SELECT id,
                       (document_ref IS NOT NULL AND TRIM(document_ref) != '') AS has_document,
                       (address_ref IS NOT NULL AND TRIM(address_ref) != '') AS has_address
                FROM records
                WHERE {ELIGIBLE_PREDICATE}
            ),
            joined AS (
                SELECT e.id,
                       s.record_id IS NOT NULL AS has_status,
                       (NOT e.has_document OR COALESCE(s.document_done, 0) != 0)
                           AND (NOT e.has_address OR COALESCE(s.address_done, 0) != 0) AS is_full,
                       (COALESCE(s.document_done, 0) != 0 OR COALESCE(s.address_done, 0) != 0) AS any_done
                FROM eligible e
                LEFT JOIN download_status s ON s.record_id = e.id
            )
            SELECT COUNT(*),
                   COALESCE(SUM(CASE WHEN has_status AND is_full THEN 1 ELSE 0 END), 0),
                   COALESCE(SUM(CASE WHEN has_status AND NOT is_full AND any_done THEN 1 ELSE 0 END), 0)
            FROM joined
            "#
        );

        let (total, fully, partially): (i64, i64, i64) = sqlx::query_as(&query)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Sqlx)?;

        let progress_percent = if total > 0 {
            fully as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        Ok(CoverageSummary {
            total_records: total,
            fully_downloaded: fully,
            partially_downloaded: partially,
            not_downloaded: total - fully - partially,
            remaining: total - fully,
            progress_percent,
        })
    }
}

#[async_trait]
impl RecordSource for Database {
    async fn count_eligible(&self) -> Result<i64> {
        let query = format!("SELECT COUNT(*) FROM records WHERE {ELIGIBLE_PREDICATE}");
        let count: i64 = sqlx::query_scalar(&query)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Sqlx)?;
        Ok(count)
    }

    async fn page(&self, limit: i64, offset: i64) -> Result<Vec<Record>> {
        let query = format!(
            "SELECT {RECORD_COLUMNS} FROM records WHERE {ELIGIBLE_PREDICATE} ORDER BY id ASC LIMIT ? OFFSET ?"
        );
        let rows: Vec<RecordRow> = sqlx::query_as(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Sqlx)?;
        Ok(rows.into_iter().map(Record::from).collect())
    }

    async fn find(&self, id: RecordId) -> Result<Option<Record>> {
        let query = format!("SELECT {RECORD_COLUMNS} FROM records WHERE id = ?");
        let row: Option<RecordRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Sqlx)?;
        Ok(row.map(Record::from))
    }
}
