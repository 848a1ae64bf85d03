use std::io::{Seek, Write};
use std::path::Path;

use serde::Serialize;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::chart::{render_svg, AxisLimits};
use super::table::write_table_csv;
use super::Result;
use crate::data::pipeline::{slugify, Panel, PipelineConfig};

/// Description of an archive's contents, stored as `manifest.json`.
#[derive(Debug, Serialize)]
struct Manifest<'a> {
    condition: &'a str,
    title: &'a str,
    limits: &'a AxisLimits,
    panels: Vec<PanelEntry<'a>>,
}

#[derive(Debug, Serialize)]
struct PanelEntry<'a> {
    title: &'a str,
    table: String,
    chart: String,
    config: PipelineConfig,
    rows: usize,
    columns: Vec<&'a str>,
    warnings: &'a [String],
}

/// Bundle one DLS condition's panels into a zip archive.
///
/// Layout, with `<c>` the condition slug:
/// ```text
/// <c>/manifest.json
/// <c>/<c>_all_panels.svg
/// <c>/<panel>.csv
/// <c>/<panel>.svg
/// ```
pub fn write_archive<W: Write + Seek>(
    writer: W,
    condition: &str,
    panels: &[Panel],
    title: &str,
    limits: &AxisLimits,
) -> Result<W> {
    let dir = slugify(condition);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(writer);

    let mut entries = Vec::with_capacity(panels.len());
    for panel in panels {
        let table_name = format!("{dir}/{}.csv", panel.slug);
        zip.start_file(table_name.as_str(), options)?;
        write_table_csv(&panel.comparison.table, &mut zip)?;

        let chart_name = format!("{dir}/{}.svg", panel.slug);
        let panel_title = if title.is_empty() {
            panel.title.clone()
        } else {
            format!("{title}: {}", panel.title)
        };
        let svg = render_svg(std::slice::from_ref(panel), &panel_title, limits)?;
        zip.start_file(chart_name.as_str(), options)?;
        zip.write_all(svg.as_bytes())?;

        entries.push(PanelEntry {
            title: &panel.title,
            table: table_name,
            chart: chart_name,
            config: panel.comparison.config,
            rows: panel.comparison.table.row_count(),
            columns: panel.comparison.table.column_names().collect(),
            warnings: &panel.comparison.warnings,
        });
    }

    if !panels.is_empty() {
        let combined = render_svg(panels, title, limits)?;
        zip.start_file(format!("{dir}/{dir}_all_panels.svg"), options)?;
        zip.write_all(combined.as_bytes())?;
    }

    let manifest = Manifest {
        condition,
        title,
        limits,
        panels: entries,
    };
    zip.start_file(format!("{dir}/manifest.json"), options)?;
    serde_json::to_writer_pretty(&mut zip, &manifest)?;

    Ok(zip.finish()?)
}

pub fn save_archive(
    path: &Path,
    condition: &str,
    panels: &[Panel],
    title: &str,
    limits: &AxisLimits,
) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_archive(file, condition, panels, title, limits)?;
    log::info!(
        "Wrote archive for condition '{condition}' with {} panel(s) to {}",
        panels.len(),
        path.display()
    );
    Ok(())
}
