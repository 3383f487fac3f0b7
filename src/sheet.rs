//! Spreadsheet intake: workbook parsing into header-keyed [`RawRow`]s and the schema-checked decoding of those rows
//! into [`InventoryRow`]s.
//!
//! Headers are matched trimmed and case-insensitively, in any order. Columns other than the six listed in [`columns`]
//! are ignored.
use std::collections::HashMap;
use std::path::Path;

use calamine::open_workbook_auto;
use calamine::Data;
use calamine::Reader;
use garde::Validate;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::types::LedgerError;
use crate::types::Result;

pub mod columns {
    pub const NDC: &str = "NDC";
    pub const DRUG_NAME: &str = "Drug Name";
    pub const QUANTITY_ORDERED: &str = "Quantity Ordered";
    pub const DOSAGE: &str = "Dosage/Concentration";
    pub const MANUFACTURER: &str = "Manufacturer";
    pub const WHOLESALER: &str = "Wholesaler";

    pub const REQUIRED: [&str; 4] = [NDC, DRUG_NAME, QUANTITY_ORDERED, WHOLESALER];
}

/// A spreadsheet cell, independent of the workbook format it came from.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// A formula error such as `#DIV/0!`.
    Error(String),
}

impl Cell {
    fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Render the cell as text. Integral floats lose their fraction so a numeric NDC of `1234` doesn't become
    /// `"1234.0"`.
    fn as_text(&self) -> std::result::Result<String, String> {
        Ok(match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.trim().to_owned(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
            Self::Float(f) => f.to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Error(e) => return Err(format!("contains a spreadsheet error ({e})")),
        })
    }

    fn as_quantity(&self) -> std::result::Result<Option<i64>, String> {
        match self {
            Self::Empty => Ok(None),
            Self::Int(i) => Ok(Some(*i)),
            Self::Float(f) if !f.is_finite() || f.fract() != 0.0 => Err(format!("'{f}' is not a whole number")),
            Self::Float(f) if *f < i64::MIN as f64 || *f >= i64::MAX as f64 => Err(format!("'{f}' is out of range")),
            Self::Float(f) => Ok(Some(*f as i64)),
            Self::Text(s) if s.trim().is_empty() => Ok(None),
            Self::Text(s) => s
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| format!("'{}' is not a whole number", s.trim())),
            Self::Bool(b) => Err(format!("'{b}' is not a whole number")),
            Self::Error(e) => Err(format!("contains a spreadsheet error ({e})")),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Cell {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Cell {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Self::Empty,
            Data::String(s) => Self::Text(s.clone()),
            Data::Int(i) => Self::Int(*i),
            Data::Float(f) => Self::Float(*f),
            Data::Bool(b) => Self::Bool(*b),
            Data::DateTime(dt) => Self::Float(dt.as_f64()),
            Data::DateTimeIso(s) => Self::Text(s.clone()),
            Data::DurationIso(s) => Self::Text(s.clone()),
            Data::Error(e) => Self::Error(format!("{e:?}")),
        }
    }
}

fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase()
}

/// One data row of the uploaded sheet, keyed by column header. Empty cells are not stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    line:  usize,
    cells: HashMap<String, Cell>,
}

impl RawRow {
    /// `line` is the 1-based spreadsheet line the row was read from; it only shows up in error messages.
    pub fn new(line: usize) -> Self {
        Self {
            line,
            cells: HashMap::new(),
        }
    }

    pub fn with<H: AsRef<str>, C: Into<Cell>>(mut self, header: H, cell: C) -> Self {
        self.insert(header, cell);
        self
    }

    pub fn insert<H: AsRef<str>, C: Into<Cell>>(&mut self, header: H, cell: C) {
        let cell = cell.into();
        if !cell.is_empty() {
            self.cells.insert(normalize_header(header.as_ref()), cell);
        }
    }

    pub fn get(&self, header: &str) -> Option<&Cell> {
        self.cells.get(&normalize_header(header))
    }

    pub fn line(&self) -> usize {
        self.line
    }
}

/// A decoded, validated spreadsheet row ready to be written to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct InventoryRow {
    #[garde(length(min = 1))]
    pub ndc:              String,
    #[garde(length(min = 1))]
    pub drug_name:        String,
    #[garde(range(min = 0))]
    pub quantity_ordered: i64,
    #[garde(skip)]
    pub dosage:           Option<String>,
    #[garde(skip)]
    pub manufacturer:     Option<String>,
    #[garde(length(min = 1))]
    pub wholesaler:       String,
}

impl InventoryRow {
    fn column_of(field: &str) -> (&'static str, &'static str) {
        match field {
            "ndc" => (columns::NDC, "is required"),
            "drug_name" => (columns::DRUG_NAME, "is required"),
            "quantity_ordered" => (columns::QUANTITY_ORDERED, "must not be negative"),
            "wholesaler" => (columns::WHOLESALER, "is required"),
            _ => ("?", "is invalid"),
        }
    }
}

fn decode_error<S: ToString>(line: usize, column: &str, reason: S) -> LedgerError {
    LedgerError::Decode {
        line,
        column: column.to_owned(),
        reason: reason.to_string(),
    }
}

fn text_of(row: &RawRow, column: &str) -> Result<String> {
    row.get(column)
        .map_or(Ok(String::new()), Cell::as_text)
        .map_err(|reason| decode_error(row.line(), column, reason))
}

fn optional_text_of(row: &RawRow, column: &str) -> Result<Option<String>> {
    Ok(Some(text_of(row, column)?).filter(|s| !s.is_empty()))
}

/// Decode one row, failing on the first column that doesn't fit the schema.
pub fn decode_row(row: &RawRow) -> Result<InventoryRow> {
    let quantity_ordered = match row.get(columns::QUANTITY_ORDERED).map(Cell::as_quantity) {
        Some(Ok(Some(q))) => q,
        Some(Ok(None)) | None => return Err(decode_error(row.line(), columns::QUANTITY_ORDERED, "is required")),
        Some(Err(reason)) => return Err(decode_error(row.line(), columns::QUANTITY_ORDERED, reason)),
    };

    let decoded = InventoryRow {
        ndc: text_of(row, columns::NDC)?,
        drug_name: text_of(row, columns::DRUG_NAME)?,
        quantity_ordered,
        dosage: optional_text_of(row, columns::DOSAGE)?,
        manufacturer: optional_text_of(row, columns::MANUFACTURER)?,
        wholesaler: text_of(row, columns::WHOLESALER)?,
    };

    if let Err(report) = decoded.validate() {
        if let Some((path, _)) = report.iter().next() {
            let (column, reason) = InventoryRow::column_of(&path.to_string());
            return Err(decode_error(row.line(), column, reason));
        }
    }

    Ok(decoded)
}

/// Decode a whole batch. Nothing is returned unless every row decodes.
pub fn decode_rows(rows: &[RawRow]) -> Result<Vec<InventoryRow>> {
    rows.iter().map(decode_row).collect()
}

/// Read the first sheet of the workbook at `path`.
///
/// The first non-empty line is the header line and must name every [required](columns::REQUIRED) column. Fully empty
/// lines are skipped. The workbook format is picked from the file extension; when the extension is missing or unknown
/// each supported format is tried in turn.
pub fn parse_workbook(path: &Path) -> Result<Vec<RawRow>> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| LedgerError::Parse(format!("Unreadable spreadsheet: {e}")))?;

    let Some(sheet) = workbook.sheet_names().first().cloned()
    else {
        return Err(LedgerError::Parse("The workbook has no sheets".to_owned()));
    };

    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| LedgerError::Parse(format!("Cannot read sheet '{sheet}': {e}")))?;
    let first_line = range.start().map_or(1, |(row, _)| row as usize + 1);

    let mut lines = range
        .rows()
        .enumerate()
        .map(|(idx, cells)| (first_line + idx, cells))
        .filter(|(_, cells)| !cells.iter().all(|c| Cell::from(c).is_empty()));

    let Some((_, header_cells)) = lines.next()
    else {
        debug!(sheet, "empty sheet");
        return Ok(Vec::new());
    };

    let headers = header_cells
        .iter()
        .map(|c| Cell::from(c).as_text().unwrap_or_default())
        .collect::<Vec<_>>();

    for required in columns::REQUIRED {
        let wanted = normalize_header(required);
        if !headers.iter().any(|h| normalize_header(h) == wanted) {
            return Err(LedgerError::Parse(format!("Missing required column '{required}'")));
        }
    }

    let rows = lines
        .map(|(line, cells)| {
            let mut row = RawRow::new(line);
            for (header, cell) in headers.iter().zip(cells.iter()) {
                if !header.is_empty() {
                    row.insert(header, Cell::from(cell));
                }
            }
            row
        })
        .collect::<Vec<_>>();

    debug!(sheet, rows = rows.len(), "parsed workbook");

    Ok(rows)
}
