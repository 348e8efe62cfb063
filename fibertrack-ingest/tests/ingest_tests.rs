//! End-to-end ingest against in-memory and SQLite stores

use async_trait::async_trait;
use fibertrack_common::config::{IngestConfig, KeyLookup};
use fibertrack_common::db::init::init_database;
use fibertrack_common::db::models::{FaultFields, FaultPatch, FaultRecord};
use fibertrack_common::store::{RecordStore, SqliteRecordStore};
use fibertrack_common::{Error, Result};
use fibertrack_ingest::{CellValue, IngestBatch, IngestService, Reconciler};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Vec-backed store enforcing key uniqueness at insert time
#[derive(Default)]
struct MemoryStore {
    records: Mutex<Vec<FaultFields>>,
}

impl MemoryStore {
    fn keys(&self) -> Vec<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.bulletin_number.clone())
            .collect()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn existing_keys(&self) -> Result<HashSet<String>> {
        Ok(self.keys().into_iter().collect())
    }

    async fn filter_new_keys(&self, candidates: &HashSet<String>) -> Result<HashSet<String>> {
        let stored: HashSet<String> = self.keys().into_iter().collect();
        Ok(candidates.difference(&stored).cloned().collect())
    }

    async fn insert_all(&self, records: &[FaultFields]) -> Result<u64> {
        let mut stored = self.records.lock().unwrap();
        let mut seen: HashSet<&str> = stored.iter().map(|r| r.bulletin_number.as_str()).collect();
        for record in records {
            if !seen.insert(record.bulletin_number.as_str()) {
                return Err(Error::KeyConflict {
                    bulletin_number: record.bulletin_number.clone(),
                });
            }
        }
        stored.extend_from_slice(records);
        Ok(records.len() as u64)
    }

    async fn update_by_key(&self, id: i64, _patch: &FaultPatch) -> Result<FaultRecord> {
        Err(Error::NotFound(format!("Fault record {}", id)))
    }
}

fn config(key_lookup: KeyLookup) -> IngestConfig {
    IngestConfig {
        required_columns: Some(vec!["Bülten Numarası".to_string(), "Bölge".to_string()]),
        key_lookup,
        ..Default::default()
    }
}

fn batch(rows: &[(&str, &str)]) -> IngestBatch {
    let mut batch = IngestBatch::new(["Bülten Numarası", "Bölge", "Arıza Başlangıç"]);
    for (key, region) in rows {
        batch.push_row(vec![
            CellValue::text(*key),
            CellValue::text(*region),
            CellValue::text("12 Mart 2025 09:00:00"),
        ]);
    }
    batch
}

async fn sqlite_store() -> (tempfile::TempDir, Arc<SqliteRecordStore>) {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("fiberariza.db")).await.unwrap();
    (dir, Arc::new(SqliteRecordStore::new(pool)))
}

#[tokio::test]
async fn test_duplicate_and_empty_key_scenario() {
    let store = Arc::new(MemoryStore::default());
    let service = IngestService::new(store.clone(), &config(KeyLookup::Preload)).unwrap();

    let result = service
        .ingest(&batch(&[("A1", "X"), ("A1", "Y"), ("", "Z")]))
        .await
        .unwrap();

    assert_eq!(result.inserted_count, 1);
    assert_eq!(result.skipped_count, 2);
    let stored = store.records.lock().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].region, "X");
}

#[tokio::test]
async fn test_existing_key_scenario() {
    for key_lookup in [KeyLookup::Preload, KeyLookup::SetDifference] {
        let store = Arc::new(MemoryStore::default());
        store.insert_all(&[FaultFields::new("A1")]).await.unwrap();
        let service = IngestService::new(store.clone(), &config(key_lookup)).unwrap();

        let result = service
            .ingest(&batch(&[("A1", "X"), ("B2", "Y")]))
            .await
            .unwrap();

        assert_eq!(result.inserted_count, 1, "{:?}", key_lookup);
        assert_eq!(result.skipped_count, 1, "{:?}", key_lookup);
        assert_eq!(result.records[0].bulletin_number, "B2");
        assert_eq!(store.keys(), vec!["A1".to_string(), "B2".to_string()]);
    }
}

#[tokio::test]
async fn test_reingest_is_idempotent() {
    for key_lookup in [KeyLookup::Preload, KeyLookup::SetDifference] {
        let (_dir, store) = sqlite_store().await;
        let service = IngestService::new(store.clone(), &config(key_lookup)).unwrap();
        let input = batch(&[("A1", "X"), ("B2", "Y"), ("", "Z"), ("C3", "W")]);

        let first = service.ingest(&input).await.unwrap();
        assert_eq!(first.inserted_count, 3);

        let second = service.ingest(&input).await.unwrap();
        assert_eq!(second.inserted_count, 0);
        // Three valid keys, plus the blank one
        assert_eq!(second.skipped_count, 4);
        assert_eq!(store.count().await.unwrap(), 3);
    }
}

#[tokio::test]
async fn test_schema_gate_inserts_nothing() {
    let (_dir, store) = sqlite_store().await;
    let service = IngestService::new(store.clone(), &config(KeyLookup::Preload)).unwrap();

    let mut input = IngestBatch::new(["Bülten Numarası", "İL"]);
    for key in ["A1", "B2", "C3"] {
        input.push_row(vec![CellValue::text(key), CellValue::text("Bursa")]);
    }

    let err = service.ingest(&input).await.unwrap_err();
    assert!(matches!(err, Error::SchemaMismatch { column } if column == "Bölge"));
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_stale_key_set_fails_whole_batch() {
    let (_dir, store) = sqlite_store().await;
    let reconciler = Reconciler::default();
    let required = vec!["Bülten Numarası".to_string()];

    // Both uploads decide B2 is new from the same (empty) snapshot
    let first = reconciler
        .reconcile(&batch(&[("B2", "X")]), &required, HashSet::new())
        .unwrap();
    let second = reconciler
        .reconcile(&batch(&[("A1", "Y"), ("B2", "Y")]), &required, HashSet::new())
        .unwrap();

    store.insert_all(&first.records).await.unwrap();
    let err = store.insert_all(&second.records).await.unwrap_err();

    assert!(matches!(err, Error::KeyConflict { bulletin_number } if bulletin_number == "B2"));
    let keys = store.existing_keys().await.unwrap();
    assert_eq!(keys, ["B2".to_string()].into_iter().collect());
}

#[tokio::test]
async fn test_ingest_csv_upload() {
    let (_dir, store) = sqlite_store().await;
    let service = IngestService::new(store.clone(), &IngestConfig::default()).unwrap();

    let header = service.required_columns().join(";");
    let csv = format!(
        "{header};KORDINAT A;KORDINAT B\n\
         TT-1;Marmara;Bursa;Bursa-Yalova;Km 12;4 Nisan 2025 10:00:00;4 Nisan 2025 16:30:00;Üçüncü şahıs;İş makinesi;Hayır;6 saat;40,1828;29,0610\n\
         TT-2;Ege;İzmir;İzmir-Manisa;Km 3;;;Doğal afet;Sel;;;invalid;\n"
    );

    let result = service.ingest_file("haftalik.csv", csv.into_bytes()).await.unwrap();
    assert_eq!(result.inserted_count, 2);

    let records = store.all().await.unwrap();
    let first = &records[0].fields;
    assert_eq!(first.bulletin_number, "TT-1");
    assert_eq!(first.sla_breached, Some(false));
    assert_eq!(first.coordinate_a.as_deref(), Some("40,1828"));
    assert!(first.start_time.is_some() && first.end_time.is_some());

    let second = &records[1].fields;
    assert_eq!(second.start_time, None);
    assert_eq!(second.sla_breached, None);
    assert_eq!(second.coordinate_a.as_deref(), Some("invalid"));
}

#[tokio::test]
async fn test_unsupported_upload_rejected() {
    let store = Arc::new(MemoryStore::default());
    let service = IngestService::new(store, &IngestConfig::default()).unwrap();
    let err = service
        .ingest_file("rapor.pdf", b"%PDF".to_vec())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}
