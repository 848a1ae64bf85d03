use std::path::Path;

use anyhow::{bail, Context, Result};

use super::archimedes::parse_archimedes;
use super::model::{Population, SizeSeries};
use super::table::{display_name, RawTable, Workbook};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load and parse an Archimedes export (`.csv` / `.txt`).
pub fn load_archimedes(path: &Path, population: Population) -> Result<SizeSeries> {
    let name = display_name(path);
    match extension(path).as_str() {
        "csv" | "txt" => {}
        other => bail!("{name}: unsupported Archimedes file extension: .{other}"),
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading Archimedes file {}", path.display()))?;
    Ok(parse_archimedes(&name, &text, population)?)
}

/// Load a DLS export.  Dispatch by extension.
///
/// Supported formats:
/// * `.xlsx` / `.xlsm` / `.xls` / `.ods` – every sheet, one per condition
/// * `.csv` / `.txt` – a single sheet named after the file stem
pub fn load_dls_workbook(path: &Path) -> Result<Workbook> {
    let name = display_name(path);
    let workbook = match extension(path).as_str() {
        "xlsx" | "xlsm" | "xls" | "ods" => Workbook::open_spreadsheet(path)?,
        "csv" | "txt" => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading DLS file {}", path.display()))?;
            let table = RawTable::from_csv_str(&name, &text)?;
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("Sheet1")
                .to_string();
            Workbook::single(name.clone(), stem, table)
        }
        other => bail!("{name}: unsupported DLS file extension: .{other}"),
    };

    if workbook.sheets.is_empty() {
        bail!("{name}: workbook has no sheets");
    }
    log::info!(
        "Loaded DLS workbook {name} with sheets {:?}",
        workbook.sheet_names().collect::<Vec<_>>()
    );
    Ok(workbook)
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}
