//! Core types for bundle-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use utoipa::ToSchema;

/// Placeholder written to `info.txt` for descriptive fields that are absent
pub const UNKNOWN_FIELD: &str = "N/A";

/// Unique identifier for a record (the resume key)
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl RecordId {
    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RecordId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl sqlx::Type<sqlx::Sqlite> for RecordId {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <i64 as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <i64 as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for RecordId {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        sqlx::Encode::<sqlx::Sqlite>::encode_by_ref(&self.0, buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for RecordId {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let id = <i64 as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(Self(id))
    }
}

/// One unit of work: a record that may reference a document and an address bundle
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Record {
    /// Stable identifier, also the resume key
    pub id: RecordId,
    /// Storage namespace (jurisdiction/category code)
    pub group_key: Option<String>,
    /// CDN reference for the document bundle
    pub document_ref: Option<String>,
    /// CDN reference for the address bundle
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

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl Record {
    /// Reference for the given bundle kind, if present and not blank
    pub fn bundle_ref(&self, kind: BundleKind) -> Option<&str> {
        match kind {
            BundleKind::Document => non_blank(&self.document_ref),
            BundleKind::Address => non_blank(&self.address_ref),
        }
    }

    /// At least one bundle reference is present
    pub fn is_eligible(&self) -> bool {
        BundleKind::ALL.iter().any(|k| self.bundle_ref(*k).is_some())
    }

    /// Group key usable as a single directory name
    ///
    /// Returns `None` for missing, blank, or path-like keys (separators, `.`, `..`).
    pub fn safe_group_key(&self) -> Option<&str> {
        let key = non_blank(&self.group_key)?;
        let unsafe_key =
            key == "." || key == ".." || key.contains('/') || key.contains('\\') || key.contains('\0');
        (!unsafe_key).then_some(key)
    }

    /// Contents of the `info.txt` side file (six `key: value` lines)
    pub fn info_file_contents(&self) -> String {
        let field = |v: &Option<String>| non_blank(v).unwrap_or(UNKNOWN_FIELD).to_string();
        format!(
            "phone: {}\nemail: {}\nfirst_name: {}\nlast_name: {}\npatronymic: {}\ndocument_number: {}\n",
            field(&self.phone),
            field(&self.email),
            field(&self.first_name),
            field(&self.last_name),
            field(&self.patronymic),
            field(&self.document_number),
        )
    }
}

/// The two bundle kinds a record can reference
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BundleKind {
    /// Identity documents
    Document,
    /// Proof of address
    Address,
}

impl BundleKind {
    /// Both kinds, in processing order
    pub const ALL: [BundleKind; 2] = [BundleKind::Document, BundleKind::Address];

    /// Subdirectory of the record directory holding this kind's files
    pub fn dir_name(&self) -> &'static str {
        match self {
            BundleKind::Document => "documents",
            BundleKind::Address => "address",
        }
    }

    /// Filename prefix for this kind's files
    pub fn file_prefix(&self) -> &'static str {
        match self {
            BundleKind::Document => "document",
            BundleKind::Address => "address",
        }
    }
}

impl std::fmt::Display for BundleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.file_prefix())
    }
}

/// Persisted resume marker for one record
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DownloadStatus {
    /// Record this status belongs to
    pub record_id: RecordId,
    /// Document bundle fully downloaded
    pub document_done: bool,
    /// Address bundle fully downloaded
    pub address_done: bool,
    /// Last upsert time
    #[schema(value_type = String)]
    pub updated_at: DateTime<Utc>,
}

impl DownloadStatus {
    /// Done flag for a bundle kind
    pub fn is_done(&self, kind: BundleKind) -> bool {
        match kind {
            BundleKind::Document => self.document_done,
            BundleKind::Address => self.address_done,
        }
    }
}

/// Lifecycle state of a bulk run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    /// Never started, or stopped via cancellation
    Idle,
    /// A run is in progress
    Running,
    /// The source was exhausted without cancellation
    Completed,
    /// The run could not be set up
    Failed,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Counters for one run, updated concurrently by workers
///
/// Every field only grows within a run. Reads may lag in-flight increments.
#[derive(Debug, Default)]
pub struct RunStats {
    pub(crate) total_records: AtomicU64,
    pub(crate) processed_records: AtomicU64,
    pub(crate) successful_records: AtomicU64,
    pub(crate) failed_records: AtomicU64,
    pub(crate) skipped_records: AtomicU64,
    pub(crate) total_files: AtomicU64,
    pub(crate) successful_files: AtomicU64,
    pub(crate) failed_files: AtomicU64,
}

impl RunStats {
    pub(crate) fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn incr(counter: &AtomicU64) {
        Self::add(counter, 1);
    }

    /// Zero every counter; only called while no run is active
    pub(crate) fn reset(&self) {
        for counter in [
            &self.total_records,
            &self.processed_records,
            &self.successful_records,
            &self.failed_records,
            &self.skipped_records,
            &self.total_files,
            &self.successful_files,
            &self.failed_files,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// Copy every counter
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_records: self.total_records.load(Ordering::Relaxed),
            processed_records: self.processed_records.load(Ordering::Relaxed),
            successful_records: self.successful_records.load(Ordering::Relaxed),
            failed_records: self.failed_records.load(Ordering::Relaxed),
            skipped_records: self.skipped_records.load(Ordering::Relaxed),
            total_files: self.total_files.load(Ordering::Relaxed),
            successful_files: self.successful_files.load(Ordering::Relaxed),
            failed_files: self.failed_files.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`RunStats`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StatsSnapshot {
    /// Eligible records counted at the start of the run
    pub total_records: u64,
    /// Records taken off the channel by a worker
    pub processed_records: u64,
    /// Records whose needed bundles all downloaded this pass
    pub successful_records: u64,
    /// Records with at least one failed bundle this pass
    pub failed_records: u64,
    /// Records skipped (no group key, or already satisfied)
    pub skipped_records: u64,
    /// Files saved this run
    pub total_files: u64,
    /// Files saved successfully this run
    pub successful_files: u64,
    /// Bundles that failed this run
    pub failed_files: u64,
}

/// Result of [`BulkDownloader::status`](crate::BulkDownloader::status)
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ProgressReport {
    /// Current run state
    pub state: RunState,
    /// Counter snapshot
    pub stats: StatsSnapshot,
    /// Time since start while running, run duration once finished
    #[serde(with = "duration_secs_f64", rename = "duration_seconds")]
    #[schema(value_type = f64)]
    pub elapsed: Duration,
    /// Why the last run ended as `Failed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProgressReport {
    /// Processed records as a percentage of the eligible total (0.0 when unknown)
    pub fn progress_percent(&self) -> f64 {
        if self.stats.total_records == 0 {
            return 0.0;
        }
        self.stats.processed_records as f64 / self.stats.total_records as f64 * 100.0
    }
}

mod duration_secs_f64 {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs.max(0.0)))
    }
}

/// Outcome of downloading a single record on demand
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct RecordReport {
    /// Record that was processed
    pub record_id: RecordId,
    /// Record directory on disk
    #[schema(value_type = String)]
    pub path: PathBuf,
    /// Every file path saved (or already present) this call
    #[schema(value_type = Vec<String>)]
    pub files: Vec<PathBuf>,
    /// Document bundle is complete (this call or earlier)
    pub document_success: bool,
    /// Address bundle is complete (this call or earlier)
    pub address_success: bool,
    /// Per-kind error messages
    pub errors: Vec<String>,
}

/// Where a record's bundles live on disk
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RecordPath {
    pub record_id: RecordId,
    pub group_key: String,
    /// `<download_dir>/<group_key>/record_<id>`, whether or not it exists yet
    #[schema(value_type = String)]
    pub path: PathBuf,
}

/// How far the status store covers the eligible records
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CoverageSummary {
    /// Eligible records in the source
    pub total_records: i64,
    /// Every referenced bundle is done
    pub fully_downloaded: i64,
    /// Some but not all referenced bundles are done
    pub partially_downloaded: i64,
    /// Nothing done yet
    pub not_downloaded: i64,
    /// `total_records - fully_downloaded`
    pub remaining: i64,
    /// Fully downloaded as a percentage of the total
    pub progress_percent: f64,
}

/// Sort direction for record listings
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending by id
    Asc,
    /// Descending by id
    #[default]
    Desc,
}

impl SortOrder {
    /// Parse a case-insensitive `asc`/`desc`, falling back to the default
    pub fn parse_lenient(value: Option<&str>) -> Self {
        match value.map(str::to_ascii_lowercase).as_deref() {
            Some("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }
}

/// One eligible record joined with its status
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RecordView {
    /// Record ID
    pub record_id: RecordId,
    /// Group key (empty when absent)
    pub group_key: String,
    /// Document bundle done
    pub document: bool,
    /// Address bundle done
    pub address: bool,
    /// Document reference (empty when absent)
    pub document_files: String,
    /// Address reference (empty when absent)
    pub address_files: String,
}

/// A page of [`RecordView`]s
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RecordPage {
    /// Rows on this page
    pub data: Vec<RecordView>,
    /// Eligible records overall
    pub total: i64,
    /// 1-based page number
    pub page: u32,
    /// Rows per page
    pub per_page: u32,
    /// Number of pages
    pub total_pages: u32,
    /// Sort direction used
    pub sort_order: SortOrder,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> Record {
        Record {
            id: RecordId(42),
            group_key: Some("KZ".into()),
            ..Default::default()
        }
    }

    #[test]
    fn blank_references_do_not_make_a_record_eligible() {
        let mut r = record();
        r.document_ref = Some("   ".into());
        assert!(!r.is_eligible());
        assert_eq!(r.bundle_ref(BundleKind::Document), None);

        r.address_ref = Some(" https://cdn.example/abc/ ".into());
        assert!(r.is_eligible());
        assert_eq!(
            r.bundle_ref(BundleKind::Address),
            Some("https://cdn.example/abc/")
        );
    }

    #[test]
    fn path_like_group_keys_are_rejected() {
        for bad in ["", "  ", ".", "..", "a/b", "..\\x"] {
            let mut r = record();
            r.group_key = Some(bad.into());
            assert_eq!(r.safe_group_key(), None, "{bad:?} must be rejected");
        }
        assert_eq!(record().safe_group_key(), Some("KZ"));

        let mut r = record();
        r.group_key = None;
        assert_eq!(r.safe_group_key(), None);
    }

    #[test]
    fn info_file_uses_placeholder_for_missing_fields() {
        let mut r = record();
        r.phone = Some("+7 700 000 00 00".into());
        r.email = Some("".into());
        r.last_name = Some("Ivanova".into());

        let contents = r.info_file_contents();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(
            lines,
            vec![
                "phone: +7 700 000 00 00",
                "email: N/A",
                "first_name: N/A",
                "last_name: Ivanova",
                "patronymic: N/A",
                "document_number: N/A",
            ]
        );
    }

    #[test]
    fn progress_percent_handles_zero_total() {
        let mut report = ProgressReport {
            state: RunState::Running,
            stats: StatsSnapshot::default(),
            elapsed: Duration::ZERO,
            error: None,
        };
        assert_eq!(report.progress_percent(), 0.0);

        report.stats.total_records = 4;
        report.stats.processed_records = 1;
        assert_eq!(report.progress_percent(), 25.0);
    }

    #[test]
    fn progress_report_serializes_elapsed_as_fractional_seconds() {
        let report = ProgressReport {
            state: RunState::Completed,
            stats: StatsSnapshot::default(),
            elapsed: Duration::from_millis(1500),
            error: None,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["state"], "completed");
        assert_eq!(json["duration_seconds"], 1.5);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn sort_order_parsing_is_lenient() {
        assert_eq!(SortOrder::parse_lenient(Some("ASC")), SortOrder::Asc);
        assert_eq!(SortOrder::parse_lenient(Some("desc")), SortOrder::Desc);
        assert_eq!(SortOrder::parse_lenient(Some("sideways")), SortOrder::Desc);
        assert_eq!(SortOrder::parse_lenient(None), SortOrder::Desc);
    }
}
