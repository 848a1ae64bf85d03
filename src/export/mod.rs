//! Export of comparison results: tables (CSV / Parquet), vector charts (SVG)
//! and per-condition archives bundling both.

pub mod archive;
pub mod chart;
pub mod table;

use thiserror::Error;

/// Errors that can occur while writing or re-reading exports.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Failed to draw chart: {0}")]
    Plot(String),

    #[error("Excel error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Manifest error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed table: {0}")]
    Malformed(String),
}

pub type Result<T> = core::result::Result<T, ExportError>;

pub use archive::{save_archive, write_archive};
pub use chart::{render_svg, save_svg, AxisLimits};
pub use table::{
    load_table_parquet, read_table_csv, save_table_csv, save_table_parquet, save_table_xlsx,
    write_table_csv,
};
