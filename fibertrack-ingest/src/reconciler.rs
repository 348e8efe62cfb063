//! Batch reconciliation
//!
//! Decides which rows of an upload become new fault records. The reconciler
//! is a pure in-memory pass: it never touches the store. Callers hand it the
//! set of keys already stored (read once, up front) and commit the accepted
//! records themselves in a single transaction.
//!
//! Key lookup is O(existing + batch) memory: the whole stored key set is held
//! while the batch is walked. `IngestService` can instead ask the store for
//! the set difference of the batch's own keys when that set grows large.

use crate::batch::{CellValue, IngestBatch};
use crate::columns::{Column, ColumnMap};
use crate::dates::normalize_datetime;
use fibertrack_common::db::models::FaultFields;
use fibertrack_common::text::parse_yes_no;
use fibertrack_common::{Error, Result};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Why a row was not accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Bulletin number blank after trimming
    EmptyKey,
    /// Key already stored, or accepted earlier in the same batch
    Duplicate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRow {
    /// 0-based index among the data rows (the header row is not counted)
    pub row_index: usize,
    pub bulletin_number: Option<String>,
    pub reason: SkipReason,
}

/// Outcome of one reconcile pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Reconciliation {
    /// Accepted records in input order, not yet committed
    pub records: Vec<FaultFields>,
    pub inserted_count: usize,
    pub skipped_count: usize,
    pub skipped: Vec<SkippedRow>,
    /// Non-blank start/end cells that could not be read as a timestamp
    pub unparsed_dates: usize,
}

/// Builds new fault records from an [`IngestBatch`]
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    columns: ColumnMap,
}

impl Reconciler {
    pub fn new(columns: ColumnMap) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    /// Fail on the first required header the batch lacks.
    ///
    /// The bulletin number header is always required, listed or not: without
    /// it no row could ever be accepted.
    pub fn check_schema(&self, batch: &IngestBatch, required_columns: &[String]) -> Result<()> {
        let key_header = self.columns.header(Column::BulletinNumber);
        let missing = required_columns
            .iter()
            .map(|c| c.trim())
            .chain(std::iter::once(key_header))
            .find(|c| !batch.has_header(c));

        match missing {
            Some(column) => Err(Error::SchemaMismatch {
                column: column.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Distinct non-blank keys in the batch
    pub fn candidate_keys(&self, batch: &IngestBatch) -> HashSet<String> {
        let key_header = self.columns.header(Column::BulletinNumber);
        batch
            .rows()
            .iter()
            .filter_map(|row| row.get(key_header).and_then(CellValue::as_text))
            .collect()
    }

    /// Walk the batch in order, accepting each row whose key is non-blank and
    /// not yet seen. `existing_keys` grows as rows are accepted, so the first
    /// occurrence of a key within the batch wins.
    pub fn reconcile(
        &self,
        batch: &IngestBatch,
        required_columns: &[String],
        mut existing_keys: HashSet<String>,
    ) -> Result<Reconciliation> {
        self.check_schema(batch, required_columns)?;

        let key_header = self.columns.header(Column::BulletinNumber);
        let mut result = Reconciliation::default();

        for (row_index, row) in batch.rows().iter().enumerate() {
            let Some(key) = row.get(key_header).and_then(CellValue::as_text) else {
                result.skipped.push(SkippedRow {
                    row_index,
                    bulletin_number: None,
                    reason: SkipReason::EmptyKey,
                });
                continue;
            };

            if existing_keys.contains(&key) {
                result.skipped.push(SkippedRow {
                    row_index,
                    bulletin_number: Some(key),
                    reason: SkipReason::Duplicate,
                });
                continue;
            }

            let record = self.build_record(&key, row, &mut result.unparsed_dates);
            existing_keys.insert(key);
            result.records.push(record);
        }

        result.inserted_count = result.records.len();
        result.skipped_count = result.skipped.len();

        debug!(
            rows = batch.len(),
            accepted = result.inserted_count,
            skipped = result.skipped_count,
            unparsed_dates = result.unparsed_dates,
            "Batch reconciled"
        );
        Ok(result)
    }

    /// Absent optional columns read as empty/null
    fn build_record(
        &self,
        key: &str,
        row: &HashMap<String, CellValue>,
        unparsed_dates: &mut usize,
    ) -> FaultFields {
        let cell = |column: Column| row.get(self.columns.header(column));
        let text = |column: Column| cell(column).and_then(CellValue::as_text);
        let raw = |column: Column| cell(column).and_then(CellValue::as_raw_text);
        let yes_no = |column: Column| text(column).as_deref().and_then(parse_yes_no);
        let mut timestamp = |column: Column| {
            let cell = cell(column)?;
            let parsed = normalize_datetime(cell);
            if parsed.is_none() && !cell.is_blank() {
                *unparsed_dates += 1;
                debug!(bulletin_number = %key, column = column.field_name(), "Unreadable timestamp left empty");
            }
            parsed
        };

        let start_time = timestamp(Column::StartTime);
        let end_time = timestamp(Column::EndTime);

        FaultFields {
            bulletin_number: key.to_string(),
            week: text(Column::Week),
            region: text(Column::Region).unwrap_or_default(),
            province: text(Column::Province).unwrap_or_default(),
            route: text(Column::Route).unwrap_or_default(),
            location: text(Column::Location).unwrap_or_default(),
            start_time,
            end_time,
            consolidated_root_cause: text(Column::ConsolidatedRootCause),
            root_cause: text(Column::RootCause),
            cable_type: text(Column::CableType),
            sla_breached: yes_no(Column::SlaBreached),
            sla_duration: raw(Column::SlaDuration),
            fault_duration: raw(Column::FaultDuration),
            outage_duration: raw(Column::OutageDuration),
            permanent_solution: yes_no(Column::PermanentSolution),
            materials_used: text(Column::MaterialsUsed),
            notes: text(Column::Notes),
            coordinate_a: raw(Column::CoordinateA),
            coordinate_b: raw(Column::CoordinateB),
            escort_status: text(Column::EscortStatus),
            service_impact: text(Column::ServiceImpact),
            affected_services: text(Column::AffectedServices),
            relocation_needed: text(Column::RelocationNeeded),
            compensation_process: text(Column::CompensationProcess),
            otdr_measurement: text(Column::OtdrMeasurement),
            year: cell(Column::Year).and_then(parse_year),
        }
        .normalized()
    }
}

fn parse_year(cell: &CellValue) -> Option<i32> {
    match cell {
        CellValue::Number(n) if n.fract() == 0.0 && n.abs() < i32::MAX as f64 => Some(*n as i32),
        CellValue::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}
