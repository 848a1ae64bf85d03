use std::io::Read;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use super::error::{PipelineError, Result};

// ---------------------------------------------------------------------------
// RawTable – untyped cell grid
// ---------------------------------------------------------------------------

/// A grid of text cells exactly as they appear in the source file.
///
/// Rows may have different lengths; missing cells read as empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        RawTable { rows }
    }

    /// Parse delimited text. No header inference; every line is a row.
    pub fn from_csv_reader<R: Read>(input: &str, reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut rows = Vec::new();
        for (row_no, record) in csv_reader.records().enumerate() {
            let record = record.map_err(|e| {
                PipelineError::malformed(input, format!("CSV row {row_no}: {e}"))
            })?;
            rows.push(record.iter().map(|c| c.to_string()).collect());
        }
        Ok(RawTable { rows })
    }

    pub fn from_csv_str(input: &str, text: &str) -> Result<Self> {
        Self::from_csv_reader(input, text.as_bytes())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Widest row length.
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Numeric coercion of a cell; anything unparsable becomes NaN.
    pub fn number(&self, row: usize, col: usize) -> f64 {
        coerce_number(self.cell(row, col))
    }
}

/// Permissive numeric coercion: trimmed text parsed as `f64`, otherwise NaN.
pub fn coerce_number(cell: &str) -> f64 {
    cell.trim().parse::<f64>().unwrap_or(f64::NAN)
}

// ---------------------------------------------------------------------------
// Workbook – named sheets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub table: RawTable,
}

/// One or more sheets loaded from a single file. A CSV file yields a
/// workbook with a single sheet named after the file stem.
#[derive(Debug, Clone, PartialEq)]
pub struct Workbook {
    pub name: String,
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn single(name: impl Into<String>, sheet_name: impl Into<String>, table: RawTable) -> Self {
        Workbook {
            name: name.into(),
            sheets: vec![Sheet {
                name: sheet_name.into(),
                table,
            }],
        }
    }

    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.iter().map(|s| s.name.as_str())
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// Read every sheet of a spreadsheet (`.xlsx`, `.xlsm`, `.xls`, `.ods`).
    ///
    /// Cell positions are absolute: leading blank rows and columns that the
    /// spreadsheet reader trims are restored as empty cells.
    pub fn open_spreadsheet(path: &Path) -> Result<Self> {
        let input = display_name(path);
        let mut workbook = open_workbook_auto(path).map_err(|e| PipelineError::Workbook {
            input: input.clone(),
            reason: e.to_string(),
        })?;

        let mut sheets = Vec::new();
        for sheet_name in workbook.sheet_names() {
            let range = workbook
                .worksheet_range(&sheet_name)
                .map_err(|e| PipelineError::Workbook {
                    input: input.clone(),
                    reason: format!("sheet '{sheet_name}': {e}"),
                })?;

            let (row_offset, col_offset) = range
                .start()
                .map(|(r, c)| (r as usize, c as usize))
                .unwrap_or((0, 0));

            let mut rows: Vec<Vec<String>> = vec![Vec::new(); row_offset];
            for row in range.rows() {
                let mut cells = vec![String::new(); col_offset];
                cells.extend(row.iter().map(cell_text));
                rows.push(cells);
            }
            log::debug!("{input}: sheet '{sheet_name}' has {} rows", rows.len());
            sheets.push(Sheet {
                name: sheet_name,
                table: RawTable::new(rows),
            });
        }

        Ok(Workbook {
            name: input,
            sheets,
        })
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        _ => String::new(),
    }
}

/// File name used in messages, falling back to the full path.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}
