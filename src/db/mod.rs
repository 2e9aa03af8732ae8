//! Database layer for bundle-dl
//!
//! Handles SQLite persistence for source records and per-record download status.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] — Database lifecycle, schema migrations
//! - [`records`] — Source records, paging, listing and coverage queries
//! - [`status`] — Per-record completion flags (upsert)
//!
//! [`Database`] implements both [`RecordSource`](crate::store::RecordSource)
//! and [`StatusStore`](crate::store::StatusStore), so one handle can back a
//! [`BulkDownloader`](crate::BulkDownloader).

use crate::types::{DownloadStatus, Record, RecordId};
use sqlx::{FromRow, sqlite::SqlitePool};

mod migrations;
mod records;
mod status;

pub use records::{DEFAULT_PER_PAGE, MAX_PER_PAGE};

/// SQL predicate selecting records with at least one non-blank bundle reference
pub(crate) const ELIGIBLE_PREDICATE: &str = "((document_ref IS NOT NULL AND TRIM(document_ref) != '') \
     OR (address_ref IS NOT NULL AND TRIM(address_ref) != ''))";

/// Source record row from database
#[derive(Debug, Clone, FromRow)]
pub struct RecordRow {
    /// Record ID
    pub id: i64,
    /// Storage namespace
    pub group_key: Option<String>,
    /// Document bundle reference
    pub document_ref: Option<String>,
    /// Address bundle reference
    pub address_ref: Option<String>,
    /// Contact phone
    pub phone: Option<String>,
    /// Contact email
    pub email: Option<String>,
    /// Given name
    pub first_name: Option<String>,
    /// Family name
    pub last_name: Option<String>,
    /// Patronymic
    pub patronymic: Option<String>,
    /// Identity document number
    pub document_number: Option<String>,
}

impl From<RecordRow> for Record {
    fn from(row: RecordRow) -> Self {
        Record {
            id: RecordId(row.id),
            group_key: row.group_key,
            document_ref: row.document_ref,
            address_ref: row.address_ref,
            phone: row.phone,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            patronymic: row.patronymic,
            document_number: row.document_number,
        }
    }
}

/// Download status row from database (raw from SQLite)
#[derive(Debug, Clone, FromRow)]
pub struct StatusRow {
    /// Record this status belongs to
    pub record_id: i64,
    /// Document bundle complete (0 = no, 1 = yes)
    pub document_done: i32,
    /// Address bundle complete (0 = no, 1 = yes)
    pub address_done: i32,
    /// Unix timestamp of the last upsert
    pub updated_at: i64,
}

impl From<StatusRow> for DownloadStatus {
    fn from(row: StatusRow) -> Self {
        use chrono::{TimeZone, Utc};

        DownloadStatus {
            record_id: RecordId(row.record_id),
            document_done: row.document_done != 0,
            address_done: row.address_done != 0,
            updated_at: Utc
                .timestamp_opt(row.updated_at, 0)
                .single()
                .unwrap_or_else(Utc::now),
        }
    }
}

/// Database handle for bundle-dl
pub struct Database {
    pool: SqlitePool,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
