use eframe::egui::{Color32, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};
use egui_plot::{Legend, Line, MarkerShape, Plot, PlotPoints, Points};

use am_dls_compare::data::model::{LineStyle, Marker, DIAMETER_HEADER};
use am_dls_compare::data::pipeline::Panel;
use am_dls_compare::export::AxisLimits;

use crate::state::AppState;

/// Rows shown in the table preview.
const PREVIEW_ROWS: usize = 25;

const PLOT_HEIGHT: f32 = 340.0;

// ---------------------------------------------------------------------------
// Central panel
// ---------------------------------------------------------------------------

/// Render every comparison panel followed by the table preview.
pub fn comparison_view(ui: &mut Ui, state: &mut AppState) {
    if state.panels.is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open Archimedes and DLS files to compare  (File → Open…)");
        });
        return;
    }

    let limits = state.session.limits;
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            if !state.session.title.is_empty() {
                ui.heading(&state.session.title);
            }
            for (i, panel) in state.panels.iter().enumerate() {
                ui.strong(&panel.title);
                panel_plot(ui, i, panel, &limits);
                ui.add_space(6.0);
            }

            ui.separator();
            if state.panels.len() > 1 {
                let titles: Vec<String> = state.panels.iter().map(|p| p.title.clone()).collect();
                ui.horizontal_wrapped(|ui: &mut Ui| {
                    ui.label("Table:");
                    for (i, title) in titles.iter().enumerate() {
                        ui.selectable_value(&mut state.active_panel, i, title);
                    }
                });
            }
            if let Some(panel) = state.panels.get(state.active_panel) {
                table_preview(ui, panel);
            }
        });
}

fn panel_plot(ui: &mut Ui, index: usize, panel: &Panel, limits: &AxisLimits) {
    let (x_min, x_max) = limits.x_range(panel);

    Plot::new(("comparison_plot", index))
        .height(PLOT_HEIGHT)
        .legend(Legend::default())
        .x_axis_label(DIAMETER_HEADER)
        .y_axis_label("Normalized value (a.u.)")
        .include_x(x_min)
        .include_x(x_max)
        .include_y(0.0)
        .include_y(limits.y_max)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(false)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for series in &panel.comparison.chart {
                let c = series.style.color;
                let color = Color32::from_rgb(c.red, c.green, c.blue);
                let points: Vec<[f64; 2]> = series
                    .points
                    .iter()
                    .copied()
                    .filter(|p| p[0] >= x_min && p[0] <= x_max)
                    .collect();

                let mut line = Line::new(PlotPoints::from(points.clone()))
                    .name(&series.name)
                    .color(color)
                    .width(2.0);
                if series.style.line == LineStyle::Dashed {
                    line = line.style(egui_plot::LineStyle::dashed_loose());
                }
                plot_ui.line(line);

                let shape = match series.style.marker {
                    Marker::Circle => MarkerShape::Circle,
                    Marker::Square => MarkerShape::Square,
                };
                plot_ui.points(
                    Points::new(PlotPoints::from(points))
                        .name(&series.name)
                        .color(color)
                        .shape(shape)
                        .filled(true)
                        .radius(3.0),
                );
            }
        });
}

fn table_preview(ui: &mut Ui, panel: &Panel) {
    let table = &panel.comparison.table;
    let rows = table.row_count().min(PREVIEW_ROWS);
    ui.label(format!(
        "{}: first {rows} of {} rows",
        panel.title,
        table.row_count()
    ));

    ScrollArea::horizontal()
        .id_salt("table_preview")
        .show(ui, |ui: &mut Ui| {
            TableBuilder::new(ui)
                .striped(true)
                .column(Column::auto().at_least(90.0))
                .columns(Column::auto().at_least(120.0), table.columns.len())
                .header(20.0, |mut header| {
                    header.col(|ui: &mut Ui| {
                        ui.strong(DIAMETER_HEADER);
                    });
                    for name in table.column_names() {
                        header.col(|ui: &mut Ui| {
                            ui.strong(name);
                        });
                    }
                })
                .body(|body| {
                    body.rows(18.0, rows, |mut row| {
                        let i = row.index();
                        row.col(|ui: &mut Ui| {
                            ui.label(format_cell(table.diameters[i]));
                        });
                        for column in &table.columns {
                            row.col(|ui: &mut Ui| {
                                ui.label(format_cell(column.values[i]));
                            });
                        }
                    });
                });
        });
}

fn format_cell(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        format!("{value:.4}")
    }
}
