use crate::db::*;
use crate::store::{RecordSource, StatusStore};
use crate::types::{Record, RecordId, SortOrder};
use tempfile::NamedTempFile;

fn record(id: i64, document_ref: Option<&str>, address_ref: Option<&str>) -> Record {
    Record {
        id: RecordId(id),
        group_key: Some("KZ".to_string()),
        document_ref: document_ref.map(String::from),
        address_ref: address_ref.map(String::from),
        first_name: Some("Aida".to_string()),
        ..Default::default()
    }
}

async fn seeded_db(temp_file: &NamedTempFile) -> Database {
    let db = Database::new(temp_file.path()).await.unwrap();
    db.insert_record(&record(1, Some("https://cdn.example/a~2/"), None))
        .await
        .unwrap();
    db.insert_record(&record(2, None, None)).await.unwrap();
    db.insert_record(&record(3, Some("   "), Some("https://cdn.example/b/")))
        .await
        .unwrap();
    db.insert_record(&record(4, Some(""), Some("")))
        .await
        .unwrap();
    db.insert_record(&record(5, Some("https://cdn.example/c/"), Some("https://cdn.example/d/")))
        .await
        .unwrap();
    db
}

#[tokio::test]
async fn test_insert_record_assigns_id_when_zero() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let explicit = db.insert_record(&record(41, None, None)).await.unwrap();
    assert_eq!(explicit, RecordId(41));

    let assigned = db.insert_record(&record(0, None, None)).await.unwrap();
    assert_eq!(assigned, RecordId(42));

    db.close().await;
}

#[tokio::test]
async fn test_count_and_page_only_return_eligible_records_in_id_order() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = seeded_db(&temp_file).await;

    assert_eq!(db.count_eligible().await.unwrap(), 3);

    let first = db.page(2, 0).await.unwrap();
    let ids: Vec<i64> = first.iter().map(|r| r.id.get()).collect();
    assert_eq!(ids, vec![1, 3]);

    let second = db.page(2, 2).await.unwrap();
    let ids: Vec<i64> = second.iter().map(|r| r.id.get()).collect();
    assert_eq!(ids, vec![5]);

    assert!(db.page(2, 4).await.unwrap().is_empty());

    db.close().await;
}

#[tokio::test]
async fn test_find_returns_any_record_with_all_fields() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = seeded_db(&temp_file).await;

    // Ineligible records are still found by id
    let found = db.find(RecordId(2)).await.unwrap().unwrap();
    assert_eq!(found.first_name.as_deref(), Some("Aida"));
    assert_eq!(found.group_key.as_deref(), Some("KZ"));
    assert!(!found.is_eligible());

    assert!(db.find(RecordId(999)).await.unwrap().is_none());

    db.close().await;
}

#[tokio::test]
async fn test_list_records_joins_status_and_sorts() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = seeded_db(&temp_file).await;
    db.upsert(RecordId(5), true, false).await.unwrap();

    let page = db.list_records(1, 2, SortOrder::Desc).await.unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.per_page, 2);
    let ids: Vec<i64> = page.data.iter().map(|v| v.record_id.get()).collect();
    assert_eq!(ids, vec![5, 3]);
    assert!(page.data[0].document);
    assert!(!page.data[0].address);
    assert_eq!(page.data[1].document_files, "   ");
    assert_eq!(page.data[1].address_files, "https://cdn.example/b/");

    let asc = db.list_records(2, 2, SortOrder::Asc).await.unwrap();
    let ids: Vec<i64> = asc.data.iter().map(|v| v.record_id.get()).collect();
    assert_eq!(ids, vec![5]);
    assert_eq!(asc.sort_order, SortOrder::Asc);

    db.close().await;
}

#[tokio::test]
async fn test_list_records_normalizes_out_of_range_paging() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = seeded_db(&temp_file).await;

    let page = db.list_records(0, 500, SortOrder::Desc).await.unwrap();
    assert_eq!(page.page, 1);
    assert_eq!(page.per_page, 20);
    assert_eq!(page.total_pages, 1);
    assert_eq!(page.data.len(), 3);

    db.close().await;
}

#[tokio::test]
async fn test_coverage_summary_classifies_records() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = seeded_db(&temp_file).await;

    // Record 1 references only documents; done document means fully downloaded
    db.upsert(RecordId(1), true, false).await.unwrap();
    // Record 5 references both; only one done means partial
    db.upsert(RecordId(5), false, true).await.unwrap();
    // Record 3 has a status row with nothing done
    db.upsert(RecordId(3), false, false).await.unwrap();

    let summary = db.coverage_summary().await.unwrap();
    assert_eq!(summary.total_records, 3);
    assert_eq!(summary.fully_downloaded, 1);
    assert_eq!(summary.partially_downloaded, 1);
    assert_eq!(summary.not_downloaded, 1);
    assert_eq!(summary.remaining, 2);
    assert!((summary.progress_percent - 100.0 / 3.0).abs() < 1e-9);

    db.close().await;
}

#[tokio::test]
async fn test_coverage_summary_empty_database() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let summary = db.coverage_summary().await.unwrap();
    assert_eq!(summary.total_records, 0);
    assert_eq!(summary.not_downloaded, 0);
    assert_eq!(summary.progress_percent, 0.0);

    db.close().await;
}
