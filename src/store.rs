//! Record source and status store interfaces.
//!
//! The orchestrator reads work from a [`RecordSource`] and records progress
//! in a [`StatusStore`]. [`Database`](crate::db::Database) implements both;
//! tests substitute in-memory fakes.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{DownloadStatus, Record, RecordId};

/// Paginated cursor over records that may need downloading
///
/// # Examples
///
/// ```no_run
/// use bundle_dl::db::Database;
/// use bundle_dl::store::RecordSource;
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let db = Database::new(Path::new("bundle-dl.db")).await?;
/// let total = db.count_eligible().await?;
/// let first_page = db.page(100, 0).await?;
/// println!("{} of {} eligible records", first_page.len(), total);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Number of records with at least one non-blank bundle reference
    async fn count_eligible(&self) -> Result<i64>;

    /// Up to `limit` eligible records starting at `offset`
    ///
    /// Order must be stable across calls so that consecutive pages neither
    /// repeat nor skip records. An empty page ends the scan.
    async fn page(&self, limit: i64, offset: i64) -> Result<Vec<Record>>;

    /// Look up one record regardless of eligibility
    async fn find(&self, id: RecordId) -> Result<Option<Record>>;
}

/// Persisted per-record completion flags
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Flags stored for `id`, if any
    async fn get(&self, id: RecordId) -> Result<Option<DownloadStatus>>;

    /// Insert or overwrite the flags for `id`, refreshing `updated_at`
    async fn upsert(&self, id: RecordId, document_done: bool, address_done: bool) -> Result<()>;
}
