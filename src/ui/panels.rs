use std::path::PathBuf;

use anyhow::Context;
use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use am_dls_compare::data::dls::DlsLayout;
use am_dls_compare::data::model::{Channel, Population};
use am_dls_compare::data::pipeline::{slugify, PipelineConfig};
use am_dls_compare::export;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – inputs and settings
// ---------------------------------------------------------------------------

/// Render the left settings panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    let mut changed = false;

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.heading("Archimedes");
            ui.separator();
            for population in [Population::Positive, Population::Negative] {
                changed |= time_point_selector(ui, state, population);
            }

            ui.add_space(8.0);
            ui.heading("DLS");
            ui.separator();
            changed |= dls_selectors(ui, state);

            ui.add_space(8.0);
            ui.heading("Comparison");
            ui.separator();
            changed |= mode_selector(ui, state);

            ui.add_space(8.0);
            ui.heading("Chart");
            ui.separator();
            chart_settings(ui, state);
        });

    if changed {
        state.recompute();
    }
}

fn time_point_selector(ui: &mut Ui, state: &mut AppState, population: Population) -> bool {
    let uploads = state.session.uploads(population);
    let header = format!("{population}  ({})", uploads.len());
    let options = state.session.time_options(population);
    let mut changed = false;

    egui::CollapsingHeader::new(RichText::new(header).strong())
        .id_salt(population.short_name())
        .default_open(true)
        .show(ui, |ui: &mut Ui| {
            if state.session.uploads(population).is_empty() {
                ui.label("No files loaded.");
                return;
            }
            for upload in state.session.uploads(population) {
                ui.label(RichText::new(&upload.name).small());
            }

            if !options.is_empty() {
                let current = state.session.time_point(population).unwrap_or("").to_string();
                egui::ComboBox::from_id_salt(("time_point", population.short_name()))
                    .selected_text(&current)
                    .show_ui(ui, |ui: &mut Ui| {
                        for tp in &options {
                            if ui.selectable_label(current == *tp, tp).clicked() {
                                *state.session.time_point_mut(population) = Some(tp.clone());
                                changed = true;
                            }
                        }
                    });
            }
            if ui.small_button("Clear").clicked() {
                state.clear_archimedes(population);
            }
        });
    changed
}

fn dls_selectors(ui: &mut Ui, state: &mut AppState) -> bool {
    let Some(workbook) = &state.session.dls else {
        ui.label("No DLS file loaded.");
        return false;
    };
    ui.label(RichText::new(&workbook.name).small());

    let sheets: Vec<String> = workbook.sheet_names().map(str::to_string).collect();
    let current_sheet = state
        .session
        .selected_sheet()
        .map(|s| s.name.clone())
        .unwrap_or_default();

    ui.strong("Sheet (condition)");
    let mut picked_sheet = None;
    egui::ComboBox::from_id_salt("dls_sheet")
        .selected_text(&current_sheet)
        .show_ui(ui, |ui: &mut Ui| {
            for name in &sheets {
                if ui.selectable_label(current_sheet == *name, name).clicked() {
                    picked_sheet = Some(name.clone());
                }
            }
        });
    if let Some(name) = picked_sheet {
        state.select_sheet(name);
        return false;
    }

    let mut changed = false;
    ui.horizontal(|ui: &mut Ui| {
        ui.label("Layout:");
        changed |= ui
            .radio_value(&mut state.session.layout, DlsLayout::SingleLevel, "Single-level")
            .changed();
        changed |= ui
            .radio_value(&mut state.session.layout, DlsLayout::MultiLevel, "Multi-level")
            .changed();
    });
    if changed {
        state.session.channel = None;
        state.session.value_column = None;
    }

    match state.session.layout {
        DlsLayout::MultiLevel => {
            ui.strong("Channel");
            let channels: Vec<Channel> = if state.sheet_channels.is_empty() {
                Channel::all().collect()
            } else {
                state.sheet_channels.clone()
            };
            changed |= channel_combo(ui, "dls_channel", "All channels", &channels, &mut state.session.channel);
        }
        DlsLayout::SingleLevel => {
            ui.strong("Time point / column");
            let current = state
                .session
                .value_column
                .clone()
                .unwrap_or_else(|| "All columns".to_string());
            egui::ComboBox::from_id_salt("dls_column")
                .selected_text(current)
                .show_ui(ui, |ui: &mut Ui| {
                    changed |= ui
                        .selectable_value(&mut state.session.value_column, None, "All columns")
                        .changed();
                    for name in &state.sheet_columns {
                        changed |= ui
                            .selectable_value(&mut state.session.value_column, Some(name.clone()), name)
                            .changed();
                    }
                });

            ui.strong("Sheet contains");
            let all: Vec<Channel> = Channel::all().collect();
            changed |= channel_combo(ui, "dls_label_channel", "Unspecified", &all, &mut state.session.channel);
        }
    }
    changed
}

fn channel_combo(
    ui: &mut Ui,
    id: &str,
    none_label: &str,
    channels: &[Channel],
    selected: &mut Option<Channel>,
) -> bool {
    let mut changed = false;
    let text = selected.map_or_else(|| none_label.to_string(), |c| c.to_string());
    egui::ComboBox::from_id_salt(id)
        .selected_text(text)
        .show_ui(ui, |ui: &mut Ui| {
            changed |= ui.selectable_value(selected, None, none_label).changed();
            for &channel in channels {
                changed |= ui
                    .selectable_value(selected, Some(channel), channel.to_string())
                    .changed();
            }
        });
    changed
}

fn mode_selector(ui: &mut Ui, state: &mut AppState) -> bool {
    let mut changed = false;
    changed |= ui
        .radio_value(
            &mut state.session.config,
            PipelineConfig::overlay(),
            "Overlay (Archimedes axis, zero outside range)",
        )
        .changed();
    changed |= ui
        .radio_value(
            &mut state.session.config,
            PipelineConfig::comparison_table(),
            "Comparison table (union axis, blank outside range)",
        )
        .changed();
    changed
}

fn chart_settings(ui: &mut Ui, state: &mut AppState) {
    let limits = &mut state.session.limits;

    ui.horizontal(|ui: &mut Ui| {
        ui.label("Title");
        ui.text_edit_singleline(&mut state.session.title);
    });

    optional_bound(ui, "x min (nm)", &mut limits.x_min);
    optional_bound(ui, "x max (nm)", &mut limits.x_max);
    ui.horizontal(|ui: &mut Ui| {
        ui.label("y max");
        ui.add(egui::DragValue::new(&mut limits.y_max).speed(0.01).range(0.1..=10.0));
    });
}

fn optional_bound(ui: &mut Ui, label: &str, bound: &mut Option<f64>) {
    ui.horizontal(|ui: &mut Ui| {
        let mut enabled = bound.is_some();
        if ui.checkbox(&mut enabled, label).changed() {
            *bound = if enabled { Some(0.0) } else { None };
        }
        if let Some(value) = bound {
            ui.add(egui::DragValue::new(value).speed(1.0));
        }
    });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open Archimedes POS…").clicked() {
                open_archimedes_dialog(state, Population::Positive);
                ui.close_menu();
            }
            if ui.button("Open Archimedes NEG…").clicked() {
                open_archimedes_dialog(state, Population::Negative);
                ui.close_menu();
            }
            if ui.button("Open DLS…").clicked() {
                open_dls_dialog(state);
                ui.close_menu();
            }
        });

        ui.add_enabled_ui(!state.panels.is_empty(), |ui: &mut Ui| {
            ui.menu_button("Export", |ui: &mut Ui| {
                if ui.button("Table as CSV…").clicked() {
                    export_dialog(state, ExportKind::Csv);
                    ui.close_menu();
                }
                if ui.button("Table as Excel…").clicked() {
                    export_dialog(state, ExportKind::Xlsx);
                    ui.close_menu();
                }
                if ui.button("Table as Parquet…").clicked() {
                    export_dialog(state, ExportKind::Parquet);
                    ui.close_menu();
                }
                if ui.button("Chart as SVG…").clicked() {
                    export_dialog(state, ExportKind::Svg);
                    ui.close_menu();
                }
                if ui.button("Archive (zip)…").clicked() {
                    export_dialog(state, ExportKind::Archive);
                    ui.close_menu();
                }
            });
        });

        ui.separator();

        let n_series: usize = state.panels.iter().map(|p| p.comparison.series.len()).sum();
        if !state.panels.is_empty() {
            ui.label(format!(
                "{} panel(s), {n_series} series",
                state.panels.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        } else if !state.warnings.is_empty() {
            ui.label(RichText::new(format!("{} warning(s)", state.warnings.len())).color(Color32::YELLOW))
                .on_hover_text(state.warnings.join("\n"));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_archimedes_dialog(state: &mut AppState, population: Population) {
    let files = rfd::FileDialog::new()
        .set_title(format!("Open Archimedes files ({})", population.short_name()))
        .add_filter("Archimedes export", &["csv", "txt"])
        .pick_files();

    if let Some(paths) = files {
        state.add_archimedes(population, &paths);
    }
}

pub fn open_dls_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open DLS export")
        .add_filter("Supported files", &["xlsx", "xlsm", "xls", "ods", "csv", "txt"])
        .add_filter("Spreadsheet", &["xlsx", "xlsm", "xls", "ods"])
        .add_filter("CSV", &["csv", "txt"])
        .pick_file();

    if let Some(path) = file {
        state.set_dls_file(&path);
    }
}

#[derive(Debug, Clone, Copy)]
enum ExportKind {
    Csv,
    Xlsx,
    Parquet,
    Svg,
    Archive,
}

impl ExportKind {
    fn extension(self) -> &'static str {
        match self {
            ExportKind::Csv => "csv",
            ExportKind::Xlsx => "xlsx",
            ExportKind::Parquet => "parquet",
            ExportKind::Svg => "svg",
            ExportKind::Archive => "zip",
        }
    }
}

fn export_dialog(state: &mut AppState, kind: ExportKind) {
    let condition = state.condition();
    let stem = match kind {
        ExportKind::Csv | ExportKind::Xlsx | ExportKind::Parquet => state
            .active()
            .map(|p| format!("{}_{}", slugify(&condition), p.slug))
            .unwrap_or_else(|| slugify(&condition)),
        ExportKind::Svg | ExportKind::Archive => slugify(&condition),
    };

    let Some(path) = rfd::FileDialog::new()
        .set_title("Export")
        .set_file_name(format!("{stem}.{}", kind.extension()))
        .add_filter(kind.extension(), &[kind.extension()])
        .save_file()
    else {
        return;
    };

    match export_to(state, kind, path.clone(), &condition) {
        Ok(()) => state.status_message = None,
        Err(e) => {
            log::error!("Export failed: {e:#}");
            state.status_message = Some(format!("Error: {e:#}"));
        }
    }
}

fn export_to(state: &AppState, kind: ExportKind, path: PathBuf, condition: &str) -> anyhow::Result<()> {
    let session = &state.session;
    let result = match kind {
        ExportKind::Csv | ExportKind::Xlsx | ExportKind::Parquet => {
            let panel = state.active().context("nothing to export")?;
            let table = &panel.comparison.table;
            match kind {
                ExportKind::Csv => export::save_table_csv(table, &path),
                ExportKind::Xlsx => export::save_table_xlsx(table, &path),
                _ => export::save_table_parquet(table, &path),
            }
        }
        ExportKind::Svg => export::save_svg(&state.panels, &session.title, &session.limits, &path),
        ExportKind::Archive => {
            export::save_archive(&path, condition, &state.panels, &session.title, &session.limits)
        }
    };
    result.with_context(|| format!("exporting to {}", path.display()))
}
