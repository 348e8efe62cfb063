//! Raw upload rows

use chrono::NaiveDateTime;
use std::collections::HashMap;

/// One spreadsheet cell as read, before any field interpretation
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    /// Native spreadsheet date cell
    DateTime(NaiveDateTime),
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    /// True for empty cells and whitespace-only text
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) | CellValue::DateTime(_) => false,
        }
    }

    /// Trimmed textual form, `None` when blank.
    ///
    /// Whole numbers print without a fraction so numeric bulletin numbers
    /// read from a workbook match the same key typed as text.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            CellValue::Number(n) => Some(format_number(*n)),
            CellValue::DateTime(dt) => Some(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }

    /// Text exactly as written (no trimming), `None` only for empty cells
    pub fn as_raw_text(&self) -> Option<String> {
        match self {
            CellValue::Text(s) if s.trim().is_empty() => None,
            CellValue::Text(s) => Some(s.clone()),
            other => other.as_text(),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Header row plus data rows of one upload.
///
/// Headers are trimmed on the way in; cells under a blank header are
/// dropped, and when a header repeats the first column wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestBatch {
    headers: Vec<String>,
    rows: Vec<HashMap<String, CellValue>>,
}

impl IngestBatch {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            headers: headers
                .into_iter()
                .map(|h| h.as_ref().trim().to_string())
                .collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row given in header order. Missing trailing cells stay absent.
    pub fn push_row(&mut self, cells: Vec<CellValue>) {
        let mut row = HashMap::with_capacity(self.headers.len());
        for (header, cell) in self.headers.iter().zip(cells) {
            if header.is_empty() || row.contains_key(header) {
                continue;
            }
            row.insert(header.clone(), cell);
        }
        self.rows.push(row);
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    pub fn rows(&self) -> &[HashMap<String, CellValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
