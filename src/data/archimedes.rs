use std::sync::OnceLock;

use regex::Regex;

use super::error::{PipelineError, Result};
use super::model::{Population, SeriesTags, SizeSeries, Source};
use super::table::RawTable;

/// Instrument metadata lines preceding the column header row.
pub const ARCHIMEDES_HEADER_LINES: usize = 60;

pub const BIN_CENTER: &str = "Bin Center";

/// Bin centres are exported in micrometres.
pub const MICROMETRES_TO_NANOMETRES: f64 = 1000.0;

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse an Archimedes CSV export into a concentration-vs-diameter series.
///
/// The first [`ARCHIMEDES_HEADER_LINES`] lines are skipped; the next row
/// must contain a `Bin Center` column. Concentration is taken from the
/// column right after it (named `Average` in most exports, but not always).
/// Rows whose bin centre is not numeric (blank lines, totals, footers) are
/// dropped silently.
pub fn parse_archimedes(input: &str, text: &str, population: Population) -> Result<SizeSeries> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let body = skip_lines(text, ARCHIMEDES_HEADER_LINES);
    let table = RawTable::from_csv_str(input, body)?;

    let header = table.rows.first().ok_or_else(|| {
        PipelineError::malformed(
            input,
            format!(
                "column '{BIN_CENTER}' not found (file ends before line {})",
                ARCHIMEDES_HEADER_LINES + 1
            ),
        )
    })?;

    let bin_col = header
        .iter()
        .position(|h| h.trim() == BIN_CENTER)
        .ok_or_else(|| {
            PipelineError::malformed(
                input,
                format!(
                    "column '{BIN_CENTER}' not found in header row (line {})",
                    ARCHIMEDES_HEADER_LINES + 1
                ),
            )
        })?;
    let conc_col = bin_col + 1;
    let conc_name = header.get(conc_col).map(|h| h.trim()).ok_or_else(|| {
        PipelineError::malformed(
            input,
            format!("no concentration column after '{BIN_CENTER}'"),
        )
    })?;
    log::debug!("{input}: concentration column is '{conc_name}'");

    let mut diameters = Vec::new();
    let mut values = Vec::new();
    let mut dropped = 0usize;
    for row in 1..table.row_count() {
        let bin_um = table.number(row, bin_col);
        if !bin_um.is_finite() {
            dropped += 1;
            continue;
        }
        diameters.push(bin_um * MICROMETRES_TO_NANOMETRES);
        values.push(table.number(row, conc_col));
    }

    if diameters.is_empty() {
        return Err(PipelineError::malformed(
            input,
            format!("no numeric '{BIN_CENTER}' rows"),
        ));
    }
    if dropped > 0 {
        log::debug!("{input}: dropped {dropped} non-numeric '{BIN_CENTER}' rows");
    }

    let series = SizeSeries::new(format!("AM - {population}"), Source::Archimedes, diameters, values)
        .with_tags(SeriesTags {
            population: Some(population),
            time_point: extract_time_options(input).into_iter().next(),
            ..SeriesTags::default()
        });

    if !series.is_ascending() {
        log::warn!("{input}: '{BIN_CENTER}' values are not in ascending order");
    }
    log::info!("{input}: parsed {} Archimedes bins", series.len());
    Ok(series)
}

fn skip_lines(text: &str, n: usize) -> &str {
    if n == 0 {
        return text;
    }
    match text.match_indices('\n').nth(n - 1) {
        Some((idx, _)) => &text[idx + 1..],
        None => "",
    }
}

// ---------------------------------------------------------------------------
// Time points from file names
// ---------------------------------------------------------------------------

/// Time-point tokens (`<number><unit>`, e.g. `30min`, `5 min`, `24h`) found in
/// a file name, in first-seen order without duplicates.
///
/// Tokens mentioning `mg` are concentrations, not times, and are skipped.
/// Matching is greedy over word characters, so `5min_2mgml` is one token
/// (and therefore skipped).
pub fn extract_time_options(filename: &str) -> Vec<String> {
    static TIME_TOKEN: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(pattern) = TIME_TOKEN.get_or_init(|| Regex::new(r"\d+\s*\w+").ok()) else {
        return Vec::new();
    };

    let mut found: Vec<String> = Vec::new();
    for token in pattern.find_iter(filename).map(|m| m.as_str().trim()) {
        if !token.to_lowercase().contains("mg") && !found.iter().any(|f| f == token) {
            found.push(token.to_string());
        }
    }
    found
}

/// Index of the first file name containing `time_point`.
pub fn find_file_for_time_point<S: AsRef<str>>(names: &[S], time_point: &str) -> Option<usize> {
    names.iter().position(|n| n.as_ref().contains(time_point))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn archimedes_csv(header: &str, rows: &[&str]) -> String {
        let mut text = String::new();
        for i in 0..ARCHIMEDES_HEADER_LINES {
            text.push_str(&format!("Instrument setting {i},value {i}\n"));
        }
        text.push_str(header);
        text.push('\n');
        for row in rows {
            text.push_str(row);
            text.push('\n');
        }
        text
    }

    #[test]
    fn converts_bins_to_nanometres_and_drops_non_numeric_rows() {
        let text = archimedes_csv(
            "Bin Start,Bin Center,Average,Std Dev",
            &["0.005,0.01,5,0.1", "0.015,0.02,10,0.2", ",,,", "Total,All,20,", "0.025,0.03,5,0.1"],
        );
        let series = parse_archimedes("POS_30min.csv", &text, Population::Positive).unwrap();

        assert_eq!(series.diameters, vec![10.0, 20.0, 30.0]);
        assert_eq!(series.values, vec![5.0, 10.0, 5.0]);
        assert_eq!(series.source, Source::Archimedes);
        assert_eq!(series.label, "AM - Positively Buoyant Particles");
        assert_eq!(series.tags.time_point.as_deref(), Some("30min"));
    }

    #[test]
    fn concentration_is_the_column_after_bin_center() {
        let text = archimedes_csv("Bin Center,Concentration (#/mL),Average", &["0.1,7,99"]);
        let series = parse_archimedes("a.csv", &text, Population::Unlabeled).unwrap();
        assert_eq!(series.values, vec![7.0]);
    }

    #[test]
    fn keeps_row_order_of_unsorted_bins() {
        let text = archimedes_csv("Bin Center,Average", &["0.03,1", "0.01,2"]);
        let series = parse_archimedes("a.csv", &text, Population::Negative).unwrap();
        assert_eq!(series.diameters, vec![30.0, 10.0]);
        assert!(!series.is_ascending());
    }

    #[test]
    fn missing_bin_center_is_malformed() {
        let text = archimedes_csv("Diameter,Average", &["0.01,1"]);
        let err = parse_archimedes("bad.csv", &text, Population::Positive).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedInput { .. }));
        assert!(err.to_string().contains("'Bin Center' not found"));
        assert!(err.to_string().starts_with("bad.csv"));
    }

    #[test]
    fn no_numeric_rows_is_malformed() {
        let text = archimedes_csv("Bin Center,Average", &["n/a,1", ""]);
        let err = parse_archimedes("empty.csv", &text, Population::Positive).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedInput { .. }));
    }

    #[test]
    fn short_file_is_malformed() {
        let err = parse_archimedes("short.csv", "a,b\n1,2\n", Population::Positive).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedInput { .. }));
    }

    #[test]
    fn time_options_skip_concentrations() {
        assert_eq!(extract_time_options("POS 5 min 2 mgml.csv"), vec!["5 min"]);
        assert_eq!(extract_time_options("NEG-30min-0.5mg.csv"), vec!["30min"]);
        assert_eq!(extract_time_options("POS 24h rep 24h.csv"), vec!["24h"]);
        assert_eq!(extract_time_options("sample_5min_2mgml.csv"), Vec::<String>::new());
        assert!(extract_time_options("no digits here.csv").is_empty());
        assert_eq!(extract_time_options("run 12 .csv"), vec!["12"]);
        assert_eq!(extract_time_options("POS-2MG-10min.csv"), vec!["10min"]);
    }

    #[test]
    fn file_lookup_by_time_point() {
        let names = ["POS_5min.csv", "POS_30min.csv"];
        assert_eq!(find_file_for_time_point(&names, "30min"), Some(1));
        assert_eq!(find_file_for_time_point(&names, "2h"), None);
    }
}
