//! Ingest orchestration: read keys, reconcile, commit once

use crate::batch::IngestBatch;
use crate::columns::ColumnMap;
use crate::reconciler::{Reconciler, Reconciliation};
use crate::sheet;
use fibertrack_common::config::{IngestConfig, KeyLookup};
use fibertrack_common::store::RecordStore;
use fibertrack_common::Result;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

/// Run one ingest call against `store`.
///
/// The stored key set is read once before reconciling. A concurrent ingest
/// that commits the same key in between makes `insert_all` fail with
/// `KeyConflict`, and this whole batch is rolled back.
pub async fn ingest_batch(
    store: &dyn RecordStore,
    reconciler: &Reconciler,
    batch: &IngestBatch,
    required_columns: &[String],
    key_lookup: KeyLookup,
) -> Result<Reconciliation> {
    // Schema first: a rejected batch costs no store round trip
    reconciler.check_schema(batch, required_columns)?;

    let existing_keys = match key_lookup {
        KeyLookup::Preload => store.existing_keys().await?,
        KeyLookup::SetDifference => {
            let candidates = reconciler.candidate_keys(batch);
            let new_keys = store.filter_new_keys(&candidates).await?;
            candidates
                .difference(&new_keys)
                .cloned()
                .collect::<HashSet<_>>()
        }
    };

    let result = reconciler.reconcile(batch, required_columns, existing_keys)?;
    store.insert_all(&result.records).await?;

    info!(
        inserted = result.inserted_count,
        skipped = result.skipped_count,
        unparsed_dates = result.unparsed_dates,
        "Ingest committed"
    );
    Ok(result)
}

/// Ingest with the configured columns and key lookup strategy
#[derive(Clone)]
pub struct IngestService {
    store: Arc<dyn RecordStore>,
    reconciler: Reconciler,
    required_columns: Vec<String>,
    key_lookup: KeyLookup,
}

impl IngestService {
    pub fn new(store: Arc<dyn RecordStore>, config: &IngestConfig) -> Result<Self> {
        let columns = ColumnMap::from_config(config)?;
        let required_columns = columns.required_columns(config);
        Ok(Self {
            store,
            reconciler: Reconciler::new(columns),
            required_columns,
            key_lookup: config.key_lookup,
        })
    }

    pub fn columns(&self) -> &ColumnMap {
        self.reconciler.columns()
    }

    pub fn required_columns(&self) -> &[String] {
        &self.required_columns
    }

    pub async fn ingest(&self, batch: &IngestBatch) -> Result<Reconciliation> {
        ingest_batch(
            self.store.as_ref(),
            &self.reconciler,
            batch,
            &self.required_columns,
            self.key_lookup,
        )
        .await
    }

    /// Read an uploaded file, then ingest it
    pub async fn ingest_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<Reconciliation> {
        let batch = sheet::read_batch(file_name, bytes)?;
        info!(file_name, rows = batch.len(), "Ingesting upload");
        self.ingest(&batch).await
    }
}
