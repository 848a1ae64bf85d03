use am_dls_compare::data::archimedes::{parse_archimedes, ARCHIMEDES_HEADER_LINES};
use am_dls_compare::data::dls::{parse_dls, DlsSelection};
use am_dls_compare::data::grid::{build_grid, GridPolicy};
use am_dls_compare::data::model::{Population, SizeSeries, Source};
use am_dls_compare::data::pipeline::{assemble, PipelineConfig};
use am_dls_compare::data::table::{RawTable, Sheet};
use am_dls_compare::export::{load_table_parquet, read_table_csv, save_table_csv, save_table_parquet};

const TOLERANCE: f64 = 1e-9;

fn assert_close(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < TOLERANCE, "{actual:?} vs {expected:?}");
    }
}

fn archimedes_text(rows: &[(f64, f64)]) -> String {
    let mut text = String::new();
    for i in 0..ARCHIMEDES_HEADER_LINES {
        text.push_str(&format!("meta {i},x\n"));
    }
    text.push_str("Bin Index,Bin Center,Average\n");
    for (i, (bin, conc)) in rows.iter().enumerate() {
        text.push_str(&format!("{i},{bin},{conc}\n"));
    }
    text
}

fn dls_sheet(csv: &str) -> Sheet {
    Sheet {
        name: "Condition 1".to_string(),
        table: RawTable::from_csv_str("dls.csv", csv).unwrap(),
    }
}

#[test]
fn overlay_of_archimedes_and_dls_on_reference_grid() {
    let am = parse_archimedes(
        "POS 30min.csv",
        &archimedes_text(&[(0.01, 5.0), (0.02, 10.0), (0.03, 5.0)]),
        Population::Positive,
    )
    .unwrap();
    let sheet = dls_sheet("Diameter (nm),30min\n10,1\n20,2\n30,1\n40,0\n");
    let dls = parse_dls(
        "dls.csv",
        &sheet,
        &DlsSelection::Column {
            name: "30min".into(),
            channel: None,
        },
    )
    .unwrap();

    let out = assemble(&[am, dls], PipelineConfig::overlay()).unwrap();

    assert_close(out.grid.as_slice(), &[10.0, 20.0, 30.0]);
    assert_eq!(out.table.row_count(), 3);
    assert_eq!(out.table.columns.len(), 2);
    for column in &out.table.columns {
        assert_close(&column.values, &[0.5, 1.0, 0.5]);
    }
    assert_eq!(
        out.table.columns[0].name,
        "AM - Positively Buoyant Particles 30min (normalized)"
    );
    assert_eq!(out.table.columns[1].name, "DLS 30min (interpolated)");
    assert!(out.warnings.is_empty());
}

#[test]
fn union_grid_holds_every_anchor_diameter_once() {
    let a = SizeSeries::new("a", Source::Archimedes, vec![30.0, 10.0, 20.0], vec![1.0; 3]);
    let b = SizeSeries::new("b", Source::Archimedes, vec![20.0, 25.0, f64::NAN], vec![1.0; 3]);
    let grid = build_grid(GridPolicy::Union, &[&a, &b]).unwrap();

    assert_eq!(grid.as_slice(), &[10.0, 20.0, 25.0, 30.0]);
    for x in a.diameters.iter().chain(&b.diameters).filter(|x| x.is_finite()) {
        assert!(grid.as_slice().contains(x));
    }
    assert!(grid.as_slice().windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn normalised_columns_peak_at_one() {
    let inputs = vec![
        SizeSeries::new("AM", Source::Archimedes, vec![10.0, 20.0, 30.0], vec![2.0, 8.0, 4.0]),
        SizeSeries::new("DLS", Source::Dls, vec![5.0, 15.0, 35.0], vec![3.0, 6.0, 1.5]),
    ];
    let out = assemble(&inputs, PipelineConfig::comparison_table()).unwrap();
    for column in &out.table.columns {
        let peak = column
            .values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(f64::NEG_INFINITY, f64::max);
        assert!((peak - 1.0).abs() < TOLERANCE, "{}: peak {peak}", column.name);
    }
}

#[test]
fn exported_table_reads_back_from_disk() {
    let inputs = vec![
        SizeSeries::new("AM", Source::Archimedes, vec![10.0, 20.0, 30.0], vec![1.0, 3.0, 2.0]),
        SizeSeries::new("DLS", Source::Dls, vec![20.0, 40.0], vec![1.0, 1.0]),
    ];
    let out = assemble(&inputs, PipelineConfig::comparison_table()).unwrap();
    assert!(out.table.columns[1].values[0].is_nan());

    let dir = tempfile::tempdir().unwrap();

    let csv_path = dir.path().join("table.csv");
    save_table_csv(&out.table, &csv_path).unwrap();
    let file = std::fs::File::open(&csv_path).unwrap();
    let from_csv = read_table_csv(file).unwrap();

    let parquet_path = dir.path().join("table.parquet");
    save_table_parquet(&out.table, &parquet_path).unwrap();
    let from_parquet = load_table_parquet(&parquet_path).unwrap();

    for back in [from_csv, from_parquet] {
        assert_eq!(back.diameters, out.table.diameters);
        assert_eq!(
            back.column_names().collect::<Vec<_>>(),
            out.table.column_names().collect::<Vec<_>>()
        );
        for (x, y) in back.columns.iter().zip(&out.table.columns) {
            for (u, v) in x.values.iter().zip(&y.values) {
                assert!(u == v || (u.is_nan() && v.is_nan()));
            }
        }
    }
}
