use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;

use super::{ExportError, Result};
use crate::data::model::{ComparisonTable, TableColumn, DIAMETER_HEADER};

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// Write the table as CSV: `Diameter (nm)` followed by one column per series.
///
/// Numbers use the shortest text that parses back to the same `f64`; NaN is
/// an empty cell.
pub fn write_table_csv<W: Write>(table: &ComparisonTable, writer: W) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);

    let mut header = vec![DIAMETER_HEADER.to_string()];
    header.extend(table.column_names().map(str::to_string));
    out.write_record(&header)?;

    for (i, &diameter) in table.diameters.iter().enumerate() {
        let mut record = Vec::with_capacity(table.columns.len() + 1);
        record.push(format_cell(diameter));
        record.extend(table.columns.iter().map(|c| format_cell(c.values[i])));
        out.write_record(&record)?;
    }
    out.flush()?;
    Ok(())
}

pub fn save_table_csv(table: &ComparisonTable, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_table_csv(table, file)?;
    log::info!("Wrote {} rows to {}", table.row_count(), path.display());
    Ok(())
}

/// Read a table written by [`write_table_csv`]. The first column is taken as
/// the diameter axis whatever its header.
pub fn read_table_csv<R: Read>(reader: R) -> Result<ComparisonTable> {
    let mut input = csv::Reader::from_reader(reader);
    let headers: Vec<String> = input.headers()?.iter().map(|h| h.to_string()).collect();
    if headers.is_empty() {
        return Err(ExportError::Malformed("missing header row".into()));
    }

    let mut table = ComparisonTable {
        diameters: Vec::new(),
        columns: headers[1..]
            .iter()
            .map(|name| TableColumn {
                name: name.clone(),
                values: Vec::new(),
            })
            .collect(),
    };

    for (row_no, record) in input.records().enumerate() {
        let record = record?;
        if record.len() != headers.len() {
            return Err(ExportError::Malformed(format!(
                "row {row_no} has {} cells, expected {}",
                record.len(),
                headers.len()
            )));
        }
        table.diameters.push(parse_cell(&record[0], row_no)?);
        for (column, cell) in table.columns.iter_mut().zip(record.iter().skip(1)) {
            column.values.push(parse_cell(cell, row_no)?);
        }
    }
    Ok(table)
}

fn format_cell(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

fn parse_cell(cell: &str, row: usize) -> Result<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(f64::NAN);
    }
    cell.parse::<f64>()
        .map_err(|_| ExportError::Malformed(format!("row {row}: '{cell}' is not a number")))
}

// ---------------------------------------------------------------------------
// Excel
// ---------------------------------------------------------------------------

pub const XLSX_SHEET: &str = "Comparison";

/// Write the table as a single-sheet `.xlsx` workbook with the same layout
/// as the CSV export. NaN cells are left blank.
pub fn save_table_xlsx(table: &ComparisonTable, path: &Path) -> Result<()> {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(XLSX_SHEET)?;

    sheet.write_string(0, 0, DIAMETER_HEADER)?;
    for (c, column) in table.columns.iter().enumerate() {
        sheet.write_string(0, xlsx_col(c + 1)?, &column.name)?;
    }

    for (i, &diameter) in table.diameters.iter().enumerate() {
        let row = u32::try_from(i + 1)
            .map_err(|_| ExportError::Malformed(format!("{} rows do not fit a worksheet", table.row_count())))?;
        if !diameter.is_nan() {
            sheet.write_number(row, 0, diameter)?;
        }
        for (c, column) in table.columns.iter().enumerate() {
            let value = column.values[i];
            if !value.is_nan() {
                sheet.write_number(row, xlsx_col(c + 1)?, value)?;
            }
        }
    }

    workbook.save(path)?;
    log::info!("Wrote {} rows to {}", table.row_count(), path.display());
    Ok(())
}

fn xlsx_col(c: usize) -> Result<u16> {
    u16::try_from(c).map_err(|_| ExportError::Malformed(format!("column {c} does not fit a worksheet")))
}

// ---------------------------------------------------------------------------
// Parquet
// ---------------------------------------------------------------------------

/// Arrow representation: one nullable `Float64` column per table column,
/// NaN stored as null.
pub fn table_to_record_batch(table: &ComparisonTable) -> Result<RecordBatch> {
    let mut fields = vec![Field::new(DIAMETER_HEADER, DataType::Float64, false)];
    let mut arrays: Vec<ArrayRef> = vec![Arc::new(Float64Array::from(table.diameters.clone()))];

    for column in &table.columns {
        fields.push(Field::new(&column.name, DataType::Float64, true));
        let values: Vec<Option<f64>> = column
            .values
            .iter()
            .map(|&v| if v.is_nan() { None } else { Some(v) })
            .collect();
        arrays.push(Arc::new(Float64Array::from(values)));
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
}

pub fn save_table_parquet(table: &ComparisonTable, path: &Path) -> Result<()> {
    let batch = table_to_record_batch(table)?;
    let file = std::fs::File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(&batch)?;
    writer.close()?;
    log::info!("Wrote {} rows to {}", table.row_count(), path.display());
    Ok(())
}

/// Load a table written by [`save_table_parquet`].
pub fn load_table_parquet(path: &Path) -> Result<ComparisonTable> {
    let file = std::fs::File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut table: Option<ComparisonTable> = None;
    for batch in reader {
        let batch = batch?;
        let schema = batch.schema();
        if schema.fields().is_empty() {
            return Err(ExportError::Malformed("parquet file has no columns".into()));
        }

        let table = table.get_or_insert_with(|| ComparisonTable {
            diameters: Vec::new(),
            columns: schema.fields()[1..]
                .iter()
                .map(|f| TableColumn {
                    name: f.name().clone(),
                    values: Vec::new(),
                })
                .collect(),
        });

        table.diameters.extend(f64_column(batch.column(0))?);
        for (i, column) in table.columns.iter_mut().enumerate() {
            column.values.extend(f64_column(batch.column(i + 1))?);
        }
    }

    table.ok_or_else(|| ExportError::Malformed("parquet file has no record batches".into()))
}

fn f64_column(col: &ArrayRef) -> Result<Vec<f64>> {
    let arr = col
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| {
            ExportError::Malformed(format!("expected Float64 column, got {:?}", col.data_type()))
        })?;
    Ok(arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ComparisonTable {
        ComparisonTable {
            diameters: vec![10.0, 20.000000000000004, 30.0],
            columns: vec![
                TableColumn {
                    name: "AM - Positively Buoyant Particles (normalized)".into(),
                    values: vec![0.1 + 0.2, 1.0, f64::NAN],
                },
                TableColumn {
                    name: "DLS, with comma".into(),
                    values: vec![f64::NAN, 1e-12, 0.5],
                },
            ],
        }
    }

    fn assert_same(a: &ComparisonTable, b: &ComparisonTable) {
        assert_eq!(a.diameters, b.diameters);
        assert_eq!(a.columns.len(), b.columns.len());
        for (x, y) in a.columns.iter().zip(&b.columns) {
            assert_eq!(x.name, y.name);
            for (u, v) in x.values.iter().zip(&y.values) {
                assert!(u.to_bits() == v.to_bits() || (u.is_nan() && v.is_nan()));
            }
        }
    }

    #[test]
    fn csv_round_trip_is_exact() {
        let mut buf = Vec::new();
        write_table_csv(&table(), &mut buf).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.starts_with("Diameter (nm),"));
        assert!(text.contains("\"DLS, with comma\""));

        let back = read_table_csv(buf.as_slice()).unwrap();
        assert_same(&table(), &back);
    }

    #[test]
    fn csv_rejects_text_cells() {
        let err = read_table_csv("Diameter (nm),a\n10,high\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ExportError::Malformed(_)));
    }

    #[test]
    fn parquet_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.parquet");
        save_table_parquet(&table(), &path).unwrap();
        let back = load_table_parquet(&path).unwrap();
        assert_same(&table(), &back);
    }

    #[test]
    fn xlsx_reads_back_with_blank_nan_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.xlsx");
        save_table_xlsx(&table(), &path).unwrap();

        let workbook = crate::data::table::Workbook::open_spreadsheet(&path).unwrap();
        let sheet = workbook.sheet(XLSX_SHEET).unwrap();
        let cells = &sheet.table;
        assert_eq!(cells.cell(0, 0), DIAMETER_HEADER);
        assert_eq!(cells.cell(0, 2), "DLS, with comma");
        assert_eq!(cells.row_count(), 4);

        let expected = table();
        for (i, &d) in expected.diameters.iter().enumerate() {
            assert_eq!(cells.number(i + 1, 0), d);
            for (c, column) in expected.columns.iter().enumerate() {
                let (got, want) = (cells.number(i + 1, c + 1), column.values[i]);
                assert!(got == want || (got.is_nan() && want.is_nan()), "row {i} col {c}: {got} vs {want}");
                if want.is_nan() {
                    assert_eq!(cells.cell(i + 1, c + 1), "");
                }
            }
        }
    }

    #[test]
    fn record_batch_stores_nan_as_null() {
        let batch = table_to_record_batch(&table()).unwrap();
        assert_eq!(batch.num_columns(), 3);
        assert_eq!(batch.num_rows(), 3);
        assert_eq!(batch.column(1).null_count(), 1);
    }
}
