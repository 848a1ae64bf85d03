use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::error::Result;
use super::grid::{build_grid, reference_anchor, GridPolicy};
use super::model::{
    ChartSeries, CommonGrid, ComparisonTable, NormalizedSeries, SizeSeries, Source, TableColumn,
};
use super::normalize::normalize;
use super::resample::{resample, FillPolicy, InterpTable};
use crate::color::assign_styles;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Everything that distinguishes one comparison variant from another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub grid: GridPolicy,
    pub fill: FillPolicy,
}

impl PipelineConfig {
    /// Union grid, NaN outside each series' range.
    pub fn comparison_table() -> Self {
        PipelineConfig {
            grid: GridPolicy::Union,
            fill: FillPolicy::Nan,
        }
    }

    /// Archimedes axis as reference, curves dropping to zero outside range.
    pub fn overlay() -> Self {
        PipelineConfig {
            grid: GridPolicy::Reference,
            fill: FillPolicy::Zero,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::comparison_table()
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Result of one pipeline run.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub config: PipelineConfig,
    pub grid: CommonGrid,
    pub series: Vec<NormalizedSeries>,
    pub table: ComparisonTable,
    pub chart: Vec<ChartSeries>,
    /// Non-fatal observations worth showing to the user.
    pub warnings: Vec<String>,
}

/// One comparison panel of a multi-panel overlay.
#[derive(Debug, Clone)]
pub struct Panel {
    pub title: String,
    /// Used for export file names.
    pub slug: String,
    pub comparison: Comparison,
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Resample and normalise every series onto one grid and zip the results.
///
/// The grid is built from the Archimedes series; DLS series are only
/// evaluated on it. Without any Archimedes series the DLS series anchor the
/// grid instead.
pub fn assemble(inputs: &[SizeSeries], config: PipelineConfig) -> Result<Comparison> {
    let mut warnings = Vec::new();

    let archimedes: Vec<&SizeSeries> = inputs
        .iter()
        .filter(|s| s.source == Source::Archimedes)
        .collect();
    let anchors: Vec<&SizeSeries> = if archimedes.is_empty() {
        inputs.iter().collect()
    } else {
        archimedes
    };

    for s in anchors.iter().filter(|s| s.source == Source::Archimedes) {
        if !s.is_ascending() {
            warnings.push(format!(
                "{}: bin centres are not in ascending order; sorted before interpolation",
                column_name(s)
            ));
        }
    }
    if config.grid == GridPolicy::Reference && anchors.len() > 1 {
        if let Some(anchor) = reference_anchor(&anchors) {
            warnings.push(format!(
                "reference grid taken from '{}'; {} other anchor series resampled onto it",
                column_name(anchor),
                anchors.len() - 1
            ));
        }
    }
    for s in inputs {
        let collapsed = InterpTable::from_series(s).collapsed();
        if collapsed > 0 {
            warnings.push(format!(
                "{}: {collapsed} repeated diameter(s) collapsed, keeping the last value",
                column_name(s)
            ));
        }
    }

    let grid = build_grid(config.grid, &anchors)?;
    log::debug!("common grid: {} points ({:?})", grid.len(), config.grid);

    let series: Vec<NormalizedSeries> = inputs
        .iter()
        .map(|s| normalize(resample(s, &grid, config.fill)))
        .collect();

    let names = unique_names(inputs.iter().map(column_name));
    let table = ComparisonTable {
        diameters: grid.as_slice().to_vec(),
        columns: names
            .iter()
            .zip(&series)
            .map(|(name, s)| TableColumn {
                name: name.clone(),
                values: s.values().to_vec(),
            })
            .collect(),
    };

    let styles = assign_styles(inputs.iter().map(|s| (s.source, &s.tags)));
    let chart = names
        .into_iter()
        .zip(&series)
        .zip(styles)
        .map(|((name, s), style)| ChartSeries {
            name,
            source: s.series.source,
            points: grid
                .as_slice()
                .iter()
                .zip(s.values())
                .filter(|(_, y)| !y.is_nan())
                .map(|(&x, &y)| [x, y])
                .collect(),
            style,
        })
        .collect();

    for w in &warnings {
        log::warn!("{w}");
    }
    log::info!(
        "assembled {} series on {} grid points",
        series.len(),
        grid.len()
    );

    Ok(Comparison {
        config,
        grid,
        series,
        table,
        chart,
        warnings,
    })
}

/// One panel per DLS series, each comparing every Archimedes series with it.
pub fn assemble_panels(
    archimedes: &[SizeSeries],
    dls: &[SizeSeries],
    config: PipelineConfig,
) -> Result<Vec<Panel>> {
    let mut panels: Vec<Panel> = dls
        .iter()
        .map(|d| {
            let mut inputs = archimedes.to_vec();
            inputs.push(d.clone());
            let comparison = assemble(&inputs, config)?;
            let title = match d.tags.channel {
                Some(channel) => channel.to_string(),
                None => column_name(d),
            };
            let slug = match (d.tags.channel, &d.tags.time_point) {
                (Some(channel), _) => channel.slug(),
                (None, Some(tp)) => slugify(tp),
                (None, None) => "dls".to_string(),
            };
            Ok(Panel {
                title,
                slug,
                comparison,
            })
        })
        .collect::<Result<_>>()?;

    // Slugs become file names and must not collide.
    let mut seen = BTreeSet::new();
    for panel in &mut panels {
        let base = panel.slug.clone();
        let mut n = 2;
        while !seen.insert(panel.slug.clone()) {
            panel.slug = format!("{base}_{n}");
            n += 1;
        }
    }
    Ok(panels)
}

// ---------------------------------------------------------------------------
// Naming
// ---------------------------------------------------------------------------

/// Column / legend name embedding source, population, channel and time point.
///
/// `AM - Positively Buoyant Particles 30min (normalized)`,
/// `DLS MADLS Volume-weighted 30min (interpolated)`.
pub fn column_name(series: &SizeSeries) -> String {
    let mut parts = vec![series.label.clone()];
    if let Source::Dls = series.source {
        if let Some(condition) = &series.tags.condition {
            if series.tags.time_point.is_none() {
                parts.push(format!("[{condition}]"));
            }
        }
    }
    if let Some(tp) = &series.tags.time_point {
        parts.push(tp.clone());
    }
    parts.push(match series.source {
        Source::Archimedes => "(normalized)".to_string(),
        Source::Dls => "(interpolated)".to_string(),
    });
    parts.join(" ")
}

/// Suffix repeated names with ` #2`, ` #3`, ... so every column is unique.
fn unique_names<I: IntoIterator<Item = String>>(names: I) -> Vec<String> {
    let mut seen = BTreeSet::new();
    names
        .into_iter()
        .map(|name| {
            let mut candidate = name.clone();
            let mut n = 2;
            while !seen.insert(candidate.clone()) {
                candidate = format!("{name} #{n}");
                n += 1;
            }
            candidate
        })
        .collect()
}

pub fn slugify(text: &str) -> String {
    let slug: String = text
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    let slug = slug.trim_matches('_').to_string();
    if slug.is_empty() {
        "series".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Channel, ModeType, Population, SeriesTags, Weighting};
    use crate::data::PipelineError;

    fn am(pop: Population, xs: &[f64], ys: &[f64]) -> SizeSeries {
        SizeSeries::new(format!("AM - {pop}"), Source::Archimedes, xs.to_vec(), ys.to_vec())
            .with_tags(SeriesTags {
                population: Some(pop),
                time_point: Some("30min".into()),
                ..SeriesTags::default()
            })
    }

    fn dls(channel: Channel, xs: &[f64], ys: &[f64]) -> SizeSeries {
        SizeSeries::new(format!("DLS {channel}"), Source::Dls, xs.to_vec(), ys.to_vec())
            .with_tags(SeriesTags {
                channel: Some(channel),
                condition: Some("Sheet1".into()),
                ..SeriesTags::default()
            })
    }

    const MADLS_VOLUME: Channel = Channel::new(ModeType::Madls, Weighting::Volume);

    #[test]
    fn union_grid_over_two_populations_excludes_dls_axis() {
        let inputs = vec![
            am(Population::Positive, &[10.0, 20.0, 30.0], &[1.0, 2.0, 1.0]),
            am(Population::Negative, &[20.0, 30.0, 40.0], &[4.0, 2.0, 1.0]),
            dls(MADLS_VOLUME, &[5.0, 50.0], &[0.0, 9.0]),
        ];
        let out = assemble(&inputs, PipelineConfig::comparison_table()).unwrap();
        assert_eq!(out.grid.as_slice(), &[10.0, 20.0, 30.0, 40.0]);
        assert_eq!(out.table.row_count(), 4);
        assert_eq!(out.table.columns.len(), 3);

        let pos = &out.table.columns[0].values;
        assert_eq!(&pos[..3], &[0.5, 1.0, 0.5]);
        assert!(pos[3].is_nan());

        let neg = &out.table.columns[1].values;
        assert!(neg[0].is_nan());
        assert_eq!(&neg[1..], &[1.0, 0.5, 0.25]);

        // NaN points are left out of the chart.
        assert_eq!(out.chart[0].points.len(), 3);
        assert_eq!(out.chart[2].points.len(), 4);
    }

    #[test]
    fn overlay_fills_zero_outside_domain() {
        let inputs = vec![
            am(Population::Positive, &[10.0, 20.0, 30.0, 40.0], &[1.0, 2.0, 3.0, 4.0]),
            dls(MADLS_VOLUME, &[20.0, 30.0], &[1.0, 2.0]),
        ];
        let out = assemble(&inputs, PipelineConfig::overlay()).unwrap();
        assert_eq!(out.table.columns[1].values, vec![0.0, 0.5, 1.0, 0.0]);
    }

    #[test]
    fn dls_only_inputs_anchor_the_grid() {
        let inputs = vec![dls(MADLS_VOLUME, &[1.0, 2.0], &[1.0, 2.0])];
        let out = assemble(&inputs, PipelineConfig::comparison_table()).unwrap();
        assert_eq!(out.grid.as_slice(), &[1.0, 2.0]);
    }

    #[test]
    fn empty_inputs_fail() {
        let err = assemble(&[], PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyInput));
    }

    #[test]
    fn names_are_unique_and_descriptive() {
        let a = am(Population::Positive, &[1.0], &[1.0]);
        let inputs = vec![a.clone(), a, dls(MADLS_VOLUME, &[1.0], &[1.0])];
        let out = assemble(&inputs, PipelineConfig::comparison_table()).unwrap();
        let names: Vec<&str> = out.table.column_names().collect();
        assert_eq!(
            names,
            vec![
                "AM - Positively Buoyant Particles 30min (normalized)",
                "AM - Positively Buoyant Particles 30min (normalized) #2",
                "DLS MADLS Volume-weighted [Sheet1] (interpolated)",
            ]
        );
    }

    #[test]
    fn unsorted_archimedes_input_is_flagged() {
        let inputs = vec![am(Population::Positive, &[30.0, 10.0, 20.0], &[1.0, 1.0, 1.0])];
        let out = assemble(&inputs, PipelineConfig::comparison_table()).unwrap();
        assert_eq!(out.grid.as_slice(), &[10.0, 20.0, 30.0]);
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn repeated_dls_diameters_are_reported() {
        let inputs = vec![
            am(Population::Positive, &[10.0, 20.0, 30.0], &[1.0, 2.0, 1.0]),
            dls(MADLS_VOLUME, &[10.0, 20.0, 20.0, 30.0], &[1.0, 1.0, 3.0, 1.0]),
        ];
        let out = assemble(&inputs, PipelineConfig::comparison_table()).unwrap();
        assert_eq!(out.warnings.len(), 1);
        assert!(out.warnings[0].starts_with("DLS MADLS Volume-weighted"));
        assert!(out.warnings[0].contains("1 repeated diameter"));
        assert_eq!(out.table.columns[1].values, vec![1.0 / 3.0, 1.0, 1.0 / 3.0]);
    }

    #[test]
    fn reference_warning_names_the_anchor_in_use() {
        let empty = am(Population::Positive, &[f64::NAN], &[1.0]);
        let neg = am(Population::Negative, &[10.0, 20.0], &[1.0, 2.0]);
        let out = assemble(&[empty, neg], PipelineConfig::overlay()).unwrap();
        assert_eq!(out.grid.as_slice(), &[10.0, 20.0]);
        assert_eq!(out.warnings.len(), 1);
        assert!(out.warnings[0].contains("Negatively Buoyant"));
    }

    #[test]
    fn one_panel_per_dls_series() {
        let bs = Channel::new(ModeType::BackScatter, Weighting::Intensity);
        let archimedes = vec![am(Population::Positive, &[10.0, 20.0], &[1.0, 2.0])];
        let dls_series = vec![
            dls(bs, &[10.0, 20.0], &[2.0, 1.0]),
            dls(MADLS_VOLUME, &[10.0, 20.0], &[1.0, 1.0]),
        ];
        let panels = assemble_panels(&archimedes, &dls_series, PipelineConfig::overlay()).unwrap();
        assert_eq!(panels.len(), 2);
        assert_eq!(panels[0].title, "Back scatter Intensity-weighted");
        assert_eq!(panels[0].slug, "backscatter_intensity");
        assert_eq!(panels[1].comparison.table.columns.len(), 2);
    }

    #[test]
    fn panel_slugs_are_unique() {
        let archimedes = vec![am(Population::Positive, &[10.0, 20.0], &[1.0, 2.0])];
        let plain = SizeSeries::new("DLS", Source::Dls, vec![10.0, 20.0], vec![1.0, 1.0]);
        let panels =
            assemble_panels(&archimedes, &[plain.clone(), plain], PipelineConfig::overlay()).unwrap();
        assert_eq!(panels[0].slug, "dls");
        assert_eq!(panels[1].slug, "dls_2");
    }

    #[test]
    fn slugs_are_file_name_safe() {
        assert_eq!(slugify(" 30 min "), "30_min");
        assert_eq!(slugify("///"), "series");
    }
}
