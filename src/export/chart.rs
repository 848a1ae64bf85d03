//! Vector chart export using the [`plotters`] SVG backend.
//!
//! One panel renders as a single chart; several panels are stacked
//! vertically in one image, one chart per panel.

use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;
use serde::{Deserialize, Serialize};

use super::{ExportError, Result};
use crate::data::model::{ChartSeries, LineStyle, Marker};
use crate::data::pipeline::Panel;

const WIDTH: u32 = 900;
const PANEL_HEIGHT: u32 = 520;

/// Visible axis range. Missing x bounds follow the data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisLimits {
    pub x_min: Option<f64>,
    pub x_max: Option<f64>,
    pub y_max: f64,
}

impl Default for AxisLimits {
    fn default() -> Self {
        AxisLimits {
            x_min: None,
            x_max: None,
            y_max: 1.05,
        }
    }
}

impl AxisLimits {
    /// Resolve the x range against the data extent of `panel`.
    pub fn x_range(&self, panel: &Panel) -> (f64, f64) {
        let grid = panel.comparison.grid.as_slice();
        let data_min = grid.iter().copied().fold(f64::INFINITY, f64::min);
        let data_max = grid.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let lo = self.x_min.unwrap_or(data_min);
        let hi = self.x_max.unwrap_or(data_max);
        if !lo.is_finite() || !hi.is_finite() {
            return (0.0, 1.0);
        }
        if lo >= hi {
            return (lo - 1.0, lo + 1.0);
        }
        (lo, hi)
    }
}

/// Render every panel into one SVG document.
pub fn render_svg(panels: &[Panel], title: &str, limits: &AxisLimits) -> Result<String> {
    if panels.is_empty() {
        return Err(ExportError::Plot("nothing to draw".into()));
    }

    let mut svg = String::new();
    {
        let height = PANEL_HEIGHT * panels.len() as u32 + if title.is_empty() { 0 } else { 40 };
        let root = SVGBackend::with_string(&mut svg, (WIDTH, height)).into_drawing_area();
        root.fill(&WHITE).map_err(plot_error)?;

        let body = if title.is_empty() {
            root.clone()
        } else {
            root.titled(title, ("sans-serif", 26)).map_err(plot_error)?
        };

        let areas = body.split_evenly((panels.len(), 1));
        for (panel, area) in panels.iter().zip(areas.iter()) {
            draw_panel(area, panel, limits)?;
        }
        root.present().map_err(plot_error)?;
    }
    Ok(svg)
}

pub fn save_svg(panels: &[Panel], title: &str, limits: &AxisLimits, path: &Path) -> Result<()> {
    let svg = render_svg(panels, title, limits)?;
    std::fs::write(path, svg)?;
    log::info!("Wrote chart with {} panel(s) to {}", panels.len(), path.display());
    Ok(())
}

fn draw_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    panel: &Panel,
    limits: &AxisLimits,
) -> Result<()> {
    let (x_min, x_max) = limits.x_range(panel);

    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, ("sans-serif", 18))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(55)
        .build_cartesian_2d(x_min..x_max, 0.0..limits.y_max)
        .map_err(plot_error)?;

    chart
        .configure_mesh()
        .x_desc("Diameter (nm)")
        .y_desc("Normalized value (a.u.)")
        .draw()
        .map_err(plot_error)?;

    for series in &panel.comparison.chart {
        let c = series.style.color;
        let color = RGBColor(c.red, c.green, c.blue);
        let points = visible_points(series, x_min, x_max);

        let anno = match series.style.line {
            LineStyle::Solid => chart
                .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))
                .map_err(plot_error)?,
            LineStyle::Dashed => chart
                .draw_series(
                    dash_segments(&points, 4)
                        .into_iter()
                        .map(|seg| PathElement::new(seg, color.stroke_width(2))),
                )
                .map_err(plot_error)?,
        };
        anno.label(series.name.as_str()).legend(move |(x, y)| {
            PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
        });

        match series.style.marker {
            Marker::Circle => chart
                .draw_series(
                    points
                        .iter()
                        .map(|&p| Circle::new(p, 3, color.filled())),
                )
                .map_err(plot_error)?,
            Marker::Square => chart
                .draw_series(points.iter().map(|&p| {
                    EmptyElement::at(p) + Rectangle::new([(-3, -3), (3, 3)], color.filled())
                }))
                .map_err(plot_error)?,
        };
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .position(SeriesLabelPosition::UpperRight)
        .draw()
        .map_err(plot_error)?;
    Ok(())
}

fn visible_points(series: &ChartSeries, x_min: f64, x_max: f64) -> Vec<(f64, f64)> {
    series
        .points
        .iter()
        .filter(|p| p[0] >= x_min && p[0] <= x_max)
        .map(|p| (p[0], p[1]))
        .collect()
}

/// Split every segment of a polyline into `pieces` parts and keep every
/// other one, which reads as a dashed line.
fn dash_segments(points: &[(f64, f64)], pieces: usize) -> Vec<Vec<(f64, f64)>> {
    let pieces = pieces.max(2);
    let mut dashes = Vec::new();
    for w in points.windows(2) {
        let ((x0, y0), (x1, y1)) = (w[0], w[1]);
        let at = |k: usize| {
            let t = k as f64 / pieces as f64;
            (x0 + (x1 - x0) * t, y0 + (y1 - y0) * t)
        };
        for k in (0..pieces).step_by(2) {
            dashes.push(vec![at(k), at(k + 1)]);
        }
    }
    dashes
}

fn plot_error<E: std::fmt::Display>(e: E) -> ExportError {
    ExportError::Plot(e.to_string())
}
