// Loading spreadsheets into a plain cell grid. Both the plate detector and the
// stacked-block scanner work on `CellGrid` only, so neither cares whether the
// data came from Excel or CSV.

use std::path::Path;

use calamine::{open_workbook_auto, DataType, Reader};
use tracing::{debug, info};

use crate::errors::{AssayError, AssayResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

static EMPTY: Cell = Cell::Empty;

impl Cell {
    /// Best-effort numeric coercion: numbers as-is, text trimmed and parsed.
    /// `NaN` and infinities count as missing.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => s.trim().parse::<f64>().ok(),
            Cell::Empty => None,
        }
        .filter(|n| n.is_finite())
    }

    /// Integral value of the cell, so `1`, `"1"`, `"1.0"` and `" 1 "` all give 1.
    pub fn as_integer(&self) -> Option<i64> {
        self.as_number()
            .filter(|n| n.is_finite() && n.fract() == 0.0)
            .map(|n| n as i64)
    }

    /// Trimmed, upper-cased text used for row-label comparisons.
    pub fn label(&self) -> String {
        self.text().trim().to_uppercase()
    }

    pub fn text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => n.to_string(),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }
}

impl From<&DataType> for Cell {
    fn from(cell: &DataType) -> Self {
        match cell {
            DataType::Empty => Cell::Empty,
            DataType::Int(i) => Cell::Number(*i as f64),
            DataType::Float(f) => Cell::Number(*f),
            DataType::String(s) => Cell::Text(s.clone()),
            DataType::Bool(b) => Cell::Text(b.to_string()),
            DataType::Error(e) => Cell::Text(format!("ERR({e:?})")),
            DataType::DateTime(f) | DataType::Duration(f) => Cell::Text(f.to_string()),
            DataType::DateTimeIso(s) | DataType::DurationIso(s) => Cell::Text(s.clone()),
        }
    }
}

/// Rectangular view of one sheet. Rows may be ragged; anything outside the
/// stored cells reads as `Cell::Empty`.
#[derive(Debug, Clone, Default)]
pub struct CellGrid {
    /// File (and sheet) the grid came from, used in error messages.
    pub name: String,
    rows: Vec<Vec<Cell>>,
}

impl CellGrid {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn col_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }
}

/// Load a grid from any supported file. `sheet` only applies to workbooks;
/// without it the first sheet is used.
pub fn load_grid(path: &Path, sheet: Option<&str>) -> AssayResult<CellGrid> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => read_workbook(path, sheet),
        "csv" => read_csv_grid(path),
        _ => Err(AssayError::UnsupportedFile {
            path: path.to_path_buf(),
        }),
    }
}

pub fn is_supported(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .as_deref(),
        Some("xlsx" | "xlsm" | "xls" | "xlsb" | "ods" | "csv")
    )
}

fn read_workbook(path: &Path, sheet: Option<&str>) -> AssayResult<CellGrid> {
    let spreadsheet_err = |message: String| AssayError::Spreadsheet {
        path: path.to_path_buf(),
        message,
    };

    let mut wb = open_workbook_auto(path).map_err(|e| spreadsheet_err(e.to_string()))?;
    let range = match sheet {
        Some(name) => wb.worksheet_range(name),
        None => wb.worksheet_range_at(0),
    }
    .ok_or_else(|| spreadsheet_err(format!("worksheet {} missing", sheet.unwrap_or("#0"))))?
    .map_err(|e| spreadsheet_err(e.to_string()))?;

    // calamine trims leading empty rows/columns; pad them back so positions
    // match what the user sees in the sheet.
    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); row_offset];
    for row in range.rows() {
        let mut cells = vec![Cell::Empty; col_offset];
        cells.extend(row.iter().map(Cell::from));
        rows.push(cells);
    }

    let name = match sheet {
        Some(s) => format!("{} [{}]", path.display(), s),
        None => path.display().to_string(),
    };
    info!("Read {} rows from {}", rows.len(), name);
    Ok(CellGrid::new(name, rows))
}

fn read_csv_grid(path: &Path) -> AssayResult<CellGrid> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(
            record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        Cell::Empty
                    } else {
                        Cell::Text(field.to_string())
                    }
                })
                .collect(),
        );
    }
    debug!("CSV grid {} has {} rows", path.display(), rows.len());
    Ok(CellGrid::new(path.display().to_string(), rows))
}
