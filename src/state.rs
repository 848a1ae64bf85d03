use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Result;

use am_dls_compare::data::archimedes::{extract_time_options, find_file_for_time_point};
use am_dls_compare::data::dls::{DlsLayout, MultiLevelSheet, SingleLevelSheet};
use am_dls_compare::data::loader::{load_archimedes, load_dls_workbook};
use am_dls_compare::data::model::{Channel, Population, SizeSeries};
use am_dls_compare::data::pipeline::{assemble, assemble_panels, Panel, PipelineConfig};
use am_dls_compare::data::table::{display_name, Sheet, Workbook};
use am_dls_compare::export::AxisLimits;

// ---------------------------------------------------------------------------
// Session context
// ---------------------------------------------------------------------------

/// One parsed Archimedes upload.
#[derive(Debug, Clone)]
pub struct ArchimedesUpload {
    pub name: String,
    pub series: SizeSeries,
}

/// Uploaded files plus every user selection. Rendering never reads files;
/// everything the pipeline needs is derived from this by [`build_request`].
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub positive: Vec<ArchimedesUpload>,
    pub negative: Vec<ArchimedesUpload>,
    pub positive_time: Option<String>,
    pub negative_time: Option<String>,

    pub dls: Option<Workbook>,
    pub sheet: Option<String>,
    pub layout: DlsLayout,
    /// Multi-level: `None` means every channel the sheet carries.
    /// Single-level: only used for labelling.
    pub channel: Option<Channel>,
    /// Single-level: `None` means every value column.
    pub value_column: Option<String>,

    pub config: PipelineConfig,
    pub limits: AxisLimits,
    pub title: String,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self {
            positive: Vec::new(),
            negative: Vec::new(),
            positive_time: None,
            negative_time: None,
            dls: None,
            sheet: None,
            layout: DlsLayout::SingleLevel,
            channel: None,
            value_column: None,
            config: PipelineConfig::overlay(),
            limits: AxisLimits::default(),
            title: String::new(),
        }
    }
}

impl SessionContext {
    pub fn uploads(&self, population: Population) -> &[ArchimedesUpload] {
        match population {
            Population::Negative => &self.negative,
            _ => &self.positive,
        }
    }

    pub fn time_point(&self, population: Population) -> Option<&str> {
        match population {
            Population::Negative => self.negative_time.as_deref(),
            _ => self.positive_time.as_deref(),
        }
    }

    pub fn time_point_mut(&mut self, population: Population) -> &mut Option<String> {
        match population {
            Population::Negative => &mut self.negative_time,
            _ => &mut self.positive_time,
        }
    }

    /// Distinct time points offered for a population, sorted.
    pub fn time_options(&self, population: Population) -> Vec<String> {
        self.uploads(population)
            .iter()
            .flat_map(|upload| extract_time_options(&upload.name))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn selected_sheet(&self) -> Option<&Sheet> {
        let workbook = self.dls.as_ref()?;
        match &self.sheet {
            Some(name) => workbook.sheet(name),
            None => workbook.sheets.first(),
        }
    }
}

/// Series handed to the pipeline for one recompute.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub archimedes: Vec<SizeSeries>,
    pub dls: Vec<SizeSeries>,
    pub config: PipelineConfig,
    /// Non-fatal notes gathered while selecting inputs.
    pub notes: Vec<String>,
}

/// Pick the series the current selections refer to.
pub fn build_request(ctx: &SessionContext) -> Result<PipelineRequest> {
    let mut notes = Vec::new();

    let mut archimedes = Vec::new();
    for population in [Population::Positive, Population::Negative] {
        let uploads = ctx.uploads(population);
        if uploads.is_empty() {
            continue;
        }
        let index = match ctx.time_point(population) {
            Some(tp) => {
                let names: Vec<&str> = uploads.iter().map(|u| u.name.as_str()).collect();
                find_file_for_time_point(&names, tp).unwrap_or_else(|| {
                    notes.push(format!(
                        "no {} file matches '{tp}'; using {}",
                        population.short_name(),
                        uploads[0].name
                    ));
                    0
                })
            }
            None => 0,
        };
        archimedes.push(uploads[index].series.clone());
    }

    let mut dls = Vec::new();
    if let (Some(workbook), Some(sheet)) = (&ctx.dls, ctx.selected_sheet()) {
        match ctx.layout {
            DlsLayout::MultiLevel => {
                let parsed = MultiLevelSheet::new(&workbook.name, sheet);
                match ctx.channel {
                    Some(channel) => dls.push(parsed.parse_channel(channel)?),
                    None => {
                        let batch = parsed.parse_all_channels();
                        if batch.series.is_empty() {
                            anyhow::bail!(
                                "sheet '{}' carries no recognised DLS channel",
                                sheet.name
                            );
                        }
                        notes.extend(
                            batch
                                .skipped
                                .iter()
                                .map(|(channel, _)| format!("sheet '{}': no {channel}", sheet.name)),
                        );
                        dls = batch.series;
                    }
                }
            }
            DlsLayout::SingleLevel => {
                let parsed = SingleLevelSheet::new(&workbook.name, sheet)?;
                match &ctx.value_column {
                    Some(name) => dls.push(parsed.parse_column(name, ctx.channel)?),
                    None => {
                        let names: Vec<String> = parsed.value_columns().map(str::to_string).collect();
                        for name in &names {
                            match parsed.parse_column(name, ctx.channel) {
                                Ok(series) => dls.push(series),
                                Err(e) => {
                                    log::info!("skipping column '{name}': {e}");
                                    notes.push(format!("sheet '{}': skipped column '{name}'", sheet.name));
                                }
                            }
                        }
                        if dls.is_empty() {
                            anyhow::bail!("sheet '{}' has no numeric value column", sheet.name);
                        }
                    }
                }
            }
        }
    }

    Ok(PipelineRequest {
        archimedes,
        dls,
        config: ctx.config,
        notes,
    })
}

/// Run the pipeline: one panel per DLS series in overlay mode, one combined
/// table otherwise.
pub fn run_request(request: &PipelineRequest) -> Result<Vec<Panel>> {
    if request.archimedes.is_empty() && request.dls.is_empty() {
        return Ok(Vec::new());
    }
    if request.config == PipelineConfig::overlay() && request.dls.len() > 1 {
        return Ok(assemble_panels(&request.archimedes, &request.dls, request.config)?);
    }

    let mut inputs = request.archimedes.clone();
    inputs.extend(request.dls.iter().cloned());
    let comparison = assemble(&inputs, request.config)?;
    Ok(vec![Panel {
        title: "Comparison".to_string(),
        slug: "comparison".to_string(),
        comparison,
    }])
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
#[derive(Default)]
pub struct AppState {
    pub session: SessionContext,

    /// Result of the last recompute.
    pub panels: Vec<Panel>,

    /// Panel shown in the table preview and used for table exports.
    pub active_panel: usize,

    /// Channels / value columns of the selected DLS sheet (cached).
    pub sheet_channels: Vec<Channel>,
    pub sheet_columns: Vec<String>,

    /// Warnings of the last recompute.
    pub warnings: Vec<String>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    /// Parse Archimedes files and add them to a population's uploads.
    pub fn add_archimedes(&mut self, population: Population, paths: &[impl AsRef<Path>]) {
        let mut failures = Vec::new();
        for path in paths {
            let path = path.as_ref();
            match load_archimedes(path, population) {
                Ok(series) => {
                    log::info!(
                        "Loaded {} bins from {} as {}",
                        series.len(),
                        path.display(),
                        population.short_name()
                    );
                    let uploads = match population {
                        Population::Negative => &mut self.session.negative,
                        _ => &mut self.session.positive,
                    };
                    uploads.push(ArchimedesUpload {
                        name: display_name(path),
                        series,
                    });
                }
                Err(e) => {
                    log::error!("Failed to load file: {e:#}");
                    failures.push(format!("{e:#}"));
                }
            }
        }

        let options = self.session.time_options(population);
        let selected = self.session.time_point_mut(population);
        if selected.as_ref().map_or(true, |tp| !options.contains(tp)) {
            *selected = options.into_iter().next();
        }
        self.recompute();

        // Load failures outrank the recompute outcome.
        if !failures.is_empty() {
            self.status_message = Some(format!("Error: {}", failures.join("; ")));
        }
    }

    pub fn clear_archimedes(&mut self, population: Population) {
        match population {
            Population::Negative => self.session.negative.clear(),
            _ => self.session.positive.clear(),
        }
        *self.session.time_point_mut(population) = None;
        self.recompute();
    }

    pub fn set_dls_file(&mut self, path: &Path) {
        match load_dls_workbook(path) {
            Ok(workbook) => {
                let first = workbook.sheets.first().map(|s| s.name.clone());
                self.session.dls = Some(workbook);
                self.session.sheet = None;
                match first {
                    Some(name) => self.select_sheet(name),
                    None => self.recompute(),
                }
            }
            Err(e) => {
                log::error!("Failed to load file: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    /// Switch DLS sheet; layout and column choices follow the new sheet.
    pub fn select_sheet(&mut self, name: String) {
        self.session.sheet = Some(name);
        self.session.channel = None;
        self.session.value_column = None;
        self.refresh_sheet_choices();
        self.recompute();
    }

    /// Re-detect the layout of the selected sheet and cache its choices.
    pub fn refresh_sheet_choices(&mut self) {
        self.sheet_channels.clear();
        self.sheet_columns.clear();
        let (Some(workbook), Some(sheet)) = (&self.session.dls, self.session.selected_sheet()) else {
            return;
        };

        let layout = DlsLayout::detect(&sheet.table);
        let choices = match layout {
            DlsLayout::MultiLevel => {
                Ok((MultiLevelSheet::new(&workbook.name, sheet).available_channels(), Vec::new()))
            }
            DlsLayout::SingleLevel => SingleLevelSheet::new(&workbook.name, sheet)
                .map(|parsed| (Vec::new(), parsed.value_columns().map(str::to_string).collect())),
        };

        self.session.layout = layout;
        match choices {
            Ok((channels, columns)) => {
                self.sheet_channels = channels;
                self.sheet_columns = columns;
            }
            Err(e) => self.status_message = Some(format!("Error: {e}")),
        }
    }

    /// Rebuild every panel from the current session.
    pub fn recompute(&mut self) {
        let outcome = build_request(&self.session).and_then(|request| {
            let panels = run_request(&request)?;
            Ok((request.notes, panels))
        });

        match outcome {
            Ok((notes, panels)) => {
                self.warnings = notes;
                self.warnings.extend(
                    panels
                        .iter()
                        .flat_map(|p| p.comparison.warnings.iter().cloned()),
                );
                self.warnings.dedup();
                self.panels = panels;
                self.active_panel = self.active_panel.min(self.panels.len().saturating_sub(1));
                self.status_message = None;
            }
            Err(e) => {
                log::error!("Comparison failed: {e:#}");
                self.panels.clear();
                self.warnings.clear();
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    /// Name of the current DLS condition, used for archive layout.
    pub fn condition(&self) -> String {
        self.session
            .selected_sheet()
            .map(|s| s.name.clone())
            .unwrap_or_else(|| "comparison".to_string())
    }

    pub fn active(&self) -> Option<&Panel> {
        self.panels.get(self.active_panel)
    }
}
