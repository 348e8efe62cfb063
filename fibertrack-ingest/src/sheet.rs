//! Uploaded file → [`IngestBatch`]
//!
//! Workbooks (xlsx, xlsm, xlsb, xls, ods) are read with calamine, first sheet
//! only; the first non-empty row is the header. CSV files are read with the
//! csv crate and may use `,` or `;` as the delimiter, in UTF-8 or
//! Windows-1254.

use crate::batch::{CellValue, IngestBatch};
use crate::dates::excel_serial_to_datetime;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use fibertrack_common::{Error, Result};
use std::borrow::Cow;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Upload formats accepted by ingest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Workbook,
    Csv,
}

impl SheetFormat {
    /// Format from the upload's file extension
    pub fn from_file_name(file_name: &str) -> Result<Self> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            Some("xlsx" | "xlsm" | "xlsb" | "xls" | "ods") => Ok(SheetFormat::Workbook),
            Some("csv") => Ok(SheetFormat::Csv),
            _ => Err(Error::InvalidInput(format!(
                "Unsupported file type: {} (expected xlsx, xls, ods or csv)",
                file_name
            ))),
        }
    }
}

/// Read an uploaded file of either format
pub fn read_batch(file_name: &str, bytes: Vec<u8>) -> Result<IngestBatch> {
    let batch = match SheetFormat::from_file_name(file_name)? {
        SheetFormat::Workbook => read_workbook(bytes)?,
        SheetFormat::Csv => read_csv(&bytes)?,
    };
    debug!(file_name, rows = batch.len(), columns = batch.headers().len(), "Upload read");
    Ok(batch)
}

/// Read the first worksheet of a workbook held in memory
pub fn read_workbook(bytes: Vec<u8>) -> Result<IngestBatch> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| Error::Spreadsheet(format!("Failed to open workbook: {}", e)))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| Error::Spreadsheet("Workbook contains no sheets".to_string()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| Error::Spreadsheet(format!("Failed to read sheet '{}': {}", sheet_name, e)))?;

    let mut rows = range.rows();
    let header_row = rows
        .next()
        .ok_or_else(|| Error::Spreadsheet(format!("Sheet '{}' is empty", sheet_name)))?;

    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| CellValue::from(cell).as_text().unwrap_or_default())
        .collect();
    let mut batch = IngestBatch::new(headers);

    for row in rows {
        let cells: Vec<CellValue> = row.iter().map(CellValue::from).collect();
        if cells.iter().all(CellValue::is_blank) {
            continue;
        }
        batch.push_row(cells);
    }

    Ok(batch)
}

/// Read CSV text (header on the first line). UTF-8 with an optional BOM is
/// read as is; anything else is decoded as Windows-1254.
pub fn read_csv(bytes: &[u8]) -> Result<IngestBatch> {
    let text = decode_csv(bytes);
    let bytes = text.as_bytes();

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(sniff_delimiter(bytes))
        .from_reader(bytes);

    let mut records = reader.records();
    let headers = match records.next() {
        Some(record) => record.map_err(|e| Error::Spreadsheet(format!("CSV header: {}", e)))?,
        None => return Err(Error::Spreadsheet("CSV file is empty".to_string())),
    };
    let mut batch = IngestBatch::new(headers.iter());

    for (i, record) in records.enumerate() {
        let record = record
            .map_err(|e| Error::Spreadsheet(format!("CSV parse error at row {}: {}", i + 2, e)))?;
        let cells: Vec<CellValue> = record
            .iter()
            .map(|field| {
                if field.trim().is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::text(field)
                }
            })
            .collect();
        if cells.iter().all(CellValue::is_blank) {
            continue;
        }
        batch.push_row(cells);
    }

    Ok(batch)
}

/// Excel in a Turkish locale saves "CSV" as Windows-1254
fn decode_csv(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            debug!("CSV is not UTF-8, decoding as Windows-1254");
            let (decoded, _, _) = encoding_rs::WINDOWS_1254.decode(bytes);
            decoded
        }
    }
}

/// `;` when the header line has more semicolons than commas (Excel's
/// export in comma-decimal locales), `,` otherwise
fn sniff_delimiter(bytes: &[u8]) -> u8 {
    let first_line = bytes.split(|b| *b == b'\n').next().unwrap_or_default();
    let count = |needle: u8| first_line.iter().filter(|b| **b == needle).count();
    if count(b';') > count(b',') {
        b';'
    } else {
        b','
    }
}

impl From<&Data> for CellValue {
    fn from(cell: &Data) -> Self {
        match cell {
            Data::Empty => CellValue::Empty,
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Float(f) => CellValue::Number(*f),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Bool(b) => CellValue::Text(b.to_string()),
            Data::DateTime(dt) => {
                let serial = dt.as_f64();
                excel_serial_to_datetime(serial)
                    .map(CellValue::DateTime)
                    .unwrap_or(CellValue::Number(serial))
            }
            Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
            // Formula errors (#N/A, #REF!) carry no usable value
            Data::Error(_) => CellValue::Empty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(SheetFormat::from_file_name("arizalar.XLSX").unwrap(), SheetFormat::Workbook);
        assert_eq!(SheetFormat::from_file_name("eski.xls").unwrap(), SheetFormat::Workbook);
        assert_eq!(SheetFormat::from_file_name("liste.csv").unwrap(), SheetFormat::Csv);
        assert!(matches!(
            SheetFormat::from_file_name("notlar.txt"),
            Err(Error::InvalidInput(_))
        ));
        assert!(SheetFormat::from_file_name("uzantisiz").is_err());
    }

    #[test]
    fn test_csv_semicolon_with_bom() {
        let csv = "\u{FEFF}Bülten Numarası;Bölge;KORDINAT A\nA1;Bursa;40,18\n;;\nB2; İzmir ;\n";
        let batch = read_csv(csv.as_bytes()).unwrap();

        assert_eq!(batch.headers(), ["Bülten Numarası", "Bölge", "KORDINAT A"]);
        assert_eq!(batch.len(), 2, "blank line dropped");
        assert_eq!(
            batch.rows()[0].get("KORDINAT A"),
            Some(&CellValue::text("40,18"))
        );
        assert_eq!(batch.rows()[1].get("KORDINAT A"), Some(&CellValue::Empty));
    }

    #[test]
    fn test_csv_comma_quoted() {
        let csv = "Bülten Numarası,ACIKLAMA\nA1,\"kablo, ek kutusu\"\n";
        let batch = read_csv(csv.as_bytes()).unwrap();
        assert_eq!(
            batch.rows()[0].get("ACIKLAMA"),
            Some(&CellValue::text("kablo, ek kutusu"))
        );
    }

    #[test]
    fn test_csv_windows_1254() {
        let (encoded, _, unmappable) =
            encoding_rs::WINDOWS_1254.encode("Bülten Numarası;Bölge;İL\nTT-1;Doğu;Iğdır\n");
        assert!(!unmappable);
        assert!(std::str::from_utf8(&encoded).is_err());

        let batch = read_csv(&encoded).unwrap();
        assert_eq!(batch.headers(), ["Bülten Numarası", "Bölge", "İL"]);
        assert_eq!(batch.rows()[0].get("İL"), Some(&CellValue::text("Iğdır")));
        assert_eq!(batch.rows()[0].get("Bölge"), Some(&CellValue::text("Doğu")));
    }

    #[test]
    fn test_empty_csv_is_error() {
        assert!(matches!(read_csv(b""), Err(Error::Spreadsheet(_))));
    }

    #[test]
    fn test_workbook_round_trip() {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Bülten Numarası").unwrap();
        sheet.write_string(0, 1, " Bölge ").unwrap();
        sheet.write_string(0, 2, "Arıza Başlangıç").unwrap();
        sheet.write_number(1, 0, 1001.0).unwrap();
        sheet.write_string(1, 1, "Bursa").unwrap();
        sheet.write_number(1, 2, 45658.5).unwrap();
        sheet.write_string(3, 0, "B2").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let batch = read_workbook(bytes).unwrap();
        assert_eq!(batch.headers(), ["Bülten Numarası", "Bölge", "Arıza Başlangıç"]);
        assert_eq!(batch.len(), 2, "blank row 3 dropped");

        let first = &batch.rows()[0];
        assert_eq!(
            first.get("Bülten Numarası").and_then(CellValue::as_text).as_deref(),
            Some("1001")
        );
        assert_eq!(
            crate::dates::normalize_datetime(&first["Arıza Başlangıç"]),
            NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
        );
    }

    #[test]
    fn test_garbage_workbook_is_error() {
        assert!(matches!(
            read_workbook(b"not a workbook".to_vec()),
            Err(Error::Spreadsheet(_))
        ));
    }
}
