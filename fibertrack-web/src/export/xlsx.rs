//! Spreadsheet export
//!
//! Headers are the ingest headers, so an exported file can be uploaded again
//! (every key will then be skipped as a duplicate).

use chrono::NaiveDateTime;
use fibertrack_common::db::models::{FaultFields, FaultRecord};
use fibertrack_common::text::yes_no_label;
use fibertrack_common::{Error, Result};
use fibertrack_ingest::{Column, ColumnMap};
use rust_xlsxwriter::{Format, Workbook};

pub const SHEET_NAME: &str = "Arızalar";

/// Timestamp text the ingest date parser reads back
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

enum ExportCell {
    Text(String),
    Number(f64),
    Blank,
}

fn text(value: &Option<String>) -> ExportCell {
    value.clone().map_or(ExportCell::Blank, ExportCell::Text)
}

fn timestamp(value: Option<NaiveDateTime>) -> ExportCell {
    value.map_or(ExportCell::Blank, |dt| {
        ExportCell::Text(dt.format(DATETIME_FORMAT).to_string())
    })
}

fn yes_no(value: Option<bool>) -> ExportCell {
    match yes_no_label(value) {
        "" => ExportCell::Blank,
        label => ExportCell::Text(label.to_string()),
    }
}

fn cell_for(f: &FaultFields, column: Column) -> ExportCell {
    match column {
        Column::BulletinNumber => ExportCell::Text(f.bulletin_number.clone()),
        Column::Week => text(&f.week),
        Column::Region => ExportCell::Text(f.region.clone()),
        Column::Province => ExportCell::Text(f.province.clone()),
        Column::Route => ExportCell::Text(f.route.clone()),
        Column::Location => ExportCell::Text(f.location.clone()),
        Column::StartTime => timestamp(f.start_time),
        Column::EndTime => timestamp(f.end_time),
        Column::ConsolidatedRootCause => text(&f.consolidated_root_cause),
        Column::RootCause => text(&f.root_cause),
        Column::CableType => text(&f.cable_type),
        Column::SlaBreached => yes_no(f.sla_breached),
        Column::SlaDuration => text(&f.sla_duration),
        Column::FaultDuration => text(&f.fault_duration),
        Column::OutageDuration => text(&f.outage_duration),
        Column::PermanentSolution => yes_no(f.permanent_solution),
        Column::MaterialsUsed => text(&f.materials_used),
        Column::Notes => text(&f.notes),
        Column::CoordinateA => text(&f.coordinate_a),
        Column::CoordinateB => text(&f.coordinate_b),
        Column::EscortStatus => text(&f.escort_status),
        Column::ServiceImpact => text(&f.service_impact),
        Column::AffectedServices => text(&f.affected_services),
        Column::RelocationNeeded => text(&f.relocation_needed),
        Column::CompensationProcess => text(&f.compensation_process),
        Column::OtdrMeasurement => text(&f.otdr_measurement),
        Column::Year => f.year.map_or(ExportCell::Blank, |y| ExportCell::Number(y as f64)),
    }
}

/// One header row, then one row per record in the given order
pub fn render_xlsx(columns: &ColumnMap, records: &[FaultRecord]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = workbook
        .add_worksheet()
        .set_name(SHEET_NAME)
        .map_err(|e| Error::Internal(format!("Failed to create sheet: {}", e)))?;

    for (col, column) in Column::ALL.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, columns.header(*column), &header_format)
            .map_err(|e| Error::Internal(format!("Failed to write header: {}", e)))?;
    }

    for (i, record) in records.iter().enumerate() {
        let row = (i + 1) as u32;
        for (col, column) in Column::ALL.iter().enumerate() {
            let col = col as u16;
            let written = match cell_for(&record.fields, *column) {
                ExportCell::Text(s) => worksheet.write_string(row, col, s).map(|_| ()),
                ExportCell::Number(n) => worksheet.write_number(row, col, n).map(|_| ()),
                ExportCell::Blank => Ok(()),
            };
            written.map_err(|e| {
                Error::Internal(format!("Failed to write cell ({}, {}): {}", row, col, e))
            })?;
        }
    }

    worksheet
        .set_freeze_panes(1, 0)
        .map_err(|e| Error::Internal(format!("Failed to set freeze panes: {}", e)))?;

    workbook
        .save_to_buffer()
        .map_err(|e| Error::Internal(format!("Failed to save XLSX: {}", e)))
}
