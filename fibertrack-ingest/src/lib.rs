//! # Fibertrack Ingest
//!
//! Turns uploaded fault spreadsheets into new fault records:
//! - [`sheet`] reads XLSX/XLS/ODS/CSV uploads into an [`IngestBatch`]
//! - [`reconciler`] validates the headers, deduplicates by bulletin number
//!   and builds the records to insert
//! - [`service`] runs both against a [`RecordStore`](fibertrack_common::store::RecordStore)
//!   and commits the result in one transaction

pub mod batch;
pub mod columns;
pub mod dates;
pub mod reconciler;
pub mod service;
pub mod sheet;

pub use batch::{CellValue, IngestBatch};
pub use columns::{Column, ColumnMap};
pub use reconciler::{Reconciler, Reconciliation, SkipReason, SkippedRow};
pub use service::IngestService;
