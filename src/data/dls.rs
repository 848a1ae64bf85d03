use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::error::{PipelineError, Result};
use super::model::{Channel, ModeType, SeriesTags, SizeSeries, Source, Weighting};
use super::table::{RawTable, Sheet};

/// Rows forming the composite header of a multi-level sheet.
pub const MULTI_LEVEL_HEADER_ROWS: usize = 3;

/// Decorative rows (units, blank spacer) between the composite header and data.
pub const MULTI_LEVEL_DECORATIVE_ROWS: usize = 2;

// ---------------------------------------------------------------------------
// Layout detection
// ---------------------------------------------------------------------------

/// Header shape of a DLS export sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DlsLayout {
    /// One header row: diameter column plus one value column per time point.
    SingleLevel,
    /// Three header rows grouping columns by mode and weighting.
    MultiLevel,
}

impl DlsLayout {
    /// Multi-level when the header rows mention a DLS mode.
    pub fn detect(table: &RawTable) -> Self {
        let mentions_mode = table
            .rows
            .iter()
            .take(MULTI_LEVEL_HEADER_ROWS)
            .flatten()
            .map(|c| c.to_lowercase())
            .any(|c| ModeType::ALL.iter().any(|m| c.contains(m.needle())));
        if mentions_mode {
            DlsLayout::MultiLevel
        } else {
            DlsLayout::SingleLevel
        }
    }
}

/// What to extract from a DLS sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DlsSelection {
    /// A named value column of a single-level sheet. The channel is what the
    /// user says the sheet contains; it only affects labelling.
    Column {
        name: String,
        channel: Option<Channel>,
    },
    /// A channel of a multi-level sheet.
    Channel(Channel),
}

/// Parse one series from a DLS sheet.
pub fn parse_dls(input: &str, sheet: &Sheet, selection: &DlsSelection) -> Result<SizeSeries> {
    match selection {
        DlsSelection::Column { name, channel } => {
            SingleLevelSheet::new(input, sheet)?.parse_column(name, *channel)
        }
        DlsSelection::Channel(channel) => MultiLevelSheet::new(input, sheet).parse_channel(*channel),
    }
}

// ---------------------------------------------------------------------------
// Single-level sheets
// ---------------------------------------------------------------------------

/// A sheet with one header row, e.g. `Diameter (nm) | 5 min | 30 min | ...`.
///
/// Instrument exports usually carry a title row above the header, so the
/// header is the first of the first two rows mentioning `diameter`.
#[derive(Debug)]
pub struct SingleLevelSheet<'a> {
    input: String,
    sheet: &'a Sheet,
    header_row: usize,
    diameter_col: usize,
    value_columns: Vec<(usize, String)>,
}

impl<'a> SingleLevelSheet<'a> {
    pub fn new(input: &str, sheet: &'a Sheet) -> Result<Self> {
        let table = &sheet.table;
        let is_diameter = |c: &String| c.to_lowercase().contains("diameter");

        let header_row = (0..table.row_count().min(2))
            .find(|&r| table.rows[r].iter().any(is_diameter))
            .unwrap_or(0);
        let header = table.rows.get(header_row).ok_or_else(|| {
            PipelineError::malformed(input, format!("sheet '{}' is empty", sheet.name))
        })?;

        let diameter_col = header.iter().position(is_diameter).unwrap_or(0);
        let value_columns: Vec<(usize, String)> = header
            .iter()
            .enumerate()
            .filter(|(i, h)| *i != diameter_col && !h.trim().is_empty())
            .map(|(i, h)| (i, h.trim().to_string()))
            .collect();

        if value_columns.is_empty() {
            return Err(PipelineError::malformed(
                input,
                format!("sheet '{}' has no value columns next to the diameter column", sheet.name),
            ));
        }

        Ok(SingleLevelSheet {
            input: input.to_string(),
            sheet,
            header_row,
            diameter_col,
            value_columns,
        })
    }

    /// Names of the selectable value columns (time points / conditions).
    pub fn value_columns(&self) -> impl Iterator<Item = &str> {
        self.value_columns.iter().map(|(_, name)| name.as_str())
    }

    pub fn parse_column(&self, name: &str, channel: Option<Channel>) -> Result<SizeSeries> {
        let value_col = self
            .value_columns
            .iter()
            .find(|(_, n)| n == name)
            .map(|(i, _)| *i)
            .ok_or_else(|| {
                PipelineError::malformed(&self.input, format!("column '{name}' not found"))
            })?;

        let (diameters, values) = finite_pairs(
            &self.sheet.table,
            self.header_row + 1,
            self.diameter_col,
            value_col,
        );
        if diameters.is_empty() {
            return Err(PipelineError::malformed(
                &self.input,
                format!("column '{name}' has no numeric rows"),
            ));
        }

        let label = match channel {
            Some(ch) => format!("DLS {ch}"),
            None => "DLS".to_string(),
        };
        log::info!("{}: parsed {} DLS points from '{name}'", self.input, diameters.len());
        Ok(SizeSeries::new(label, Source::Dls, diameters, values).with_tags(SeriesTags {
            channel,
            time_point: Some(name.to_string()),
            condition: Some(self.sheet.name.clone()),
            ..SeriesTags::default()
        }))
    }
}

// ---------------------------------------------------------------------------
// Multi-level sheets: column resolution table
// ---------------------------------------------------------------------------

/// Column role within a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Size,
    Value,
}

#[derive(Debug, Clone, Copy)]
enum Part {
    Mode,
    Weighting,
    Size,
}

#[derive(Debug, Clone, Copy)]
enum Scope {
    /// All three header rows joined.
    Joined,
    /// Bottom-most non-empty header cell.
    Leaf,
}

#[derive(Debug, Clone, Copy)]
struct Rule {
    part: Part,
    scope: Scope,
    present: bool,
}

const fn has(part: Part, scope: Scope) -> Rule {
    Rule { part, scope, present: true }
}

const fn lacks(part: Part, scope: Scope) -> Rule {
    Rule { part, scope, present: false }
}

/// Ordered fallbacks; the first strategy that finds a column wins.
const SIZE_STRATEGIES: &[&[Rule]] = &[
    &[has(Part::Mode, Scope::Joined), has(Part::Weighting, Scope::Joined), has(Part::Size, Scope::Leaf)],
    &[has(Part::Mode, Scope::Joined), has(Part::Size, Scope::Leaf)],
];

const VALUE_STRATEGIES: &[&[Rule]] = &[
    &[has(Part::Mode, Scope::Joined), has(Part::Weighting, Scope::Leaf), lacks(Part::Size, Scope::Leaf)],
    &[has(Part::Mode, Scope::Joined), has(Part::Weighting, Scope::Joined), lacks(Part::Size, Scope::Leaf)],
];

fn strategies(role: Role) -> &'static [&'static [Rule]] {
    match role {
        Role::Size => SIZE_STRATEGIES,
        Role::Value => VALUE_STRATEGIES,
    }
}

#[derive(Debug, Clone)]
struct HeaderLabel {
    joined: String,
    leaf: String,
}

impl HeaderLabel {
    fn matches(&self, rule: Rule, channel: Channel) -> bool {
        let text = match rule.scope {
            Scope::Joined => &self.joined,
            Scope::Leaf => &self.leaf,
        };
        let needle = match rule.part {
            Part::Mode => channel.mode.needle(),
            Part::Weighting => channel.weighting.needle(),
            Part::Size => "size",
        };
        text.contains(needle) == rule.present
    }
}

/// Diameter and value column indices of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnPair {
    pub diameter: usize,
    pub value: usize,
}

/// Every channel of a sheet resolved once against its composite header.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    labels: Vec<HeaderLabel>,
    resolved: BTreeMap<Channel, ColumnPair>,
}

impl ColumnMap {
    pub fn resolve(table: &RawTable) -> Self {
        let labels = composite_labels(table);
        let mut map = ColumnMap {
            labels,
            resolved: BTreeMap::new(),
        };
        for channel in Channel::all() {
            let diameter = map.find(channel, Role::Size);
            let value = map.find(channel, Role::Value);
            if let (Some(diameter), Some(value)) = (diameter, value) {
                if diameter != value {
                    map.resolved.insert(channel, ColumnPair { diameter, value });
                }
            }
        }
        map
    }

    fn find(&self, channel: Channel, role: Role) -> Option<usize> {
        strategies(role).iter().find_map(|rules| {
            self.labels
                .iter()
                .position(|label| rules.iter().all(|&rule| label.matches(rule, channel)))
        })
    }

    pub fn get(&self, channel: Channel) -> Option<ColumnPair> {
        self.resolved.get(&channel).copied()
    }

    pub fn channels(&self) -> impl Iterator<Item = Channel> + '_ {
        self.resolved.keys().copied()
    }

    /// Lowercased composite label of column `col`.
    pub fn label(&self, col: usize) -> Option<&str> {
        self.labels.get(col).map(|l| l.joined.as_str())
    }
}

/// Join the header rows per column, forward-filling merged group cells.
///
/// Row 0 groups are filled left to right; row 1 groups are filled only while
/// the row 0 group continues.
fn composite_labels(table: &RawTable) -> Vec<HeaderLabel> {
    let width = table.column_count();
    let mut top = String::new();
    let mut middle = String::new();
    let mut labels = Vec::with_capacity(width);

    for col in 0..width {
        let top_cell = table.cell(0, col).trim();
        let middle_cell = table.cell(1, col).trim();
        if !top_cell.is_empty() {
            top = top_cell.to_string();
            middle.clear();
        }
        if !middle_cell.is_empty() {
            middle = middle_cell.to_string();
        }

        let rows: Vec<String> = [top.as_str(), middle.as_str(), table.cell(2, col).trim()]
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| s.to_lowercase())
            .collect();
        labels.push(HeaderLabel {
            joined: rows.join(" "),
            leaf: rows.last().cloned().unwrap_or_default(),
        });
    }
    labels
}

// ---------------------------------------------------------------------------
// Multi-level sheets: parsing
// ---------------------------------------------------------------------------

/// Outcome of extracting every available channel from one condition sheet.
#[derive(Debug, Clone, Default)]
pub struct ChannelBatch {
    pub series: Vec<SizeSeries>,
    /// Channels that could not be extracted, with the reason.
    pub skipped: Vec<(Channel, String)>,
}

/// A condition sheet with a three-row composite header.
#[derive(Debug)]
pub struct MultiLevelSheet<'a> {
    input: String,
    sheet: &'a Sheet,
    columns: ColumnMap,
}

impl<'a> MultiLevelSheet<'a> {
    pub fn new(input: &str, sheet: &'a Sheet) -> Self {
        let columns = ColumnMap::resolve(&sheet.table);
        log::debug!(
            "{input}: sheet '{}' resolves channels {:?}",
            sheet.name,
            columns.channels().collect::<Vec<_>>()
        );
        MultiLevelSheet {
            input: input.to_string(),
            sheet,
            columns,
        }
    }

    pub fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    pub fn available_channels(&self) -> Vec<Channel> {
        self.columns.channels().collect()
    }

    /// Extract one explicitly requested channel.
    pub fn parse_channel(&self, channel: Channel) -> Result<SizeSeries> {
        let pair = self.columns.get(channel).ok_or_else(|| {
            PipelineError::malformed(
                &self.input,
                format!(
                    "sheet '{}': no columns for {channel} (looked for '{}' with 'size' and '{}')",
                    self.sheet.name,
                    channel.mode.needle(),
                    channel.weighting.needle()
                ),
            )
        })?;

        let first_data_row = MULTI_LEVEL_HEADER_ROWS + MULTI_LEVEL_DECORATIVE_ROWS;
        let (diameters, values) =
            finite_pairs(&self.sheet.table, first_data_row, pair.diameter, pair.value);
        if diameters.is_empty() {
            return Err(PipelineError::malformed(
                &self.input,
                format!("sheet '{}': {channel} has no numeric rows", self.sheet.name),
            ));
        }

        Ok(
            SizeSeries::new(format!("DLS {channel}"), Source::Dls, diameters, values).with_tags(
                SeriesTags {
                    channel: Some(channel),
                    condition: Some(self.sheet.name.clone()),
                    ..SeriesTags::default()
                },
            ),
        )
    }

    /// Extract every channel, skipping the ones the sheet does not carry.
    pub fn parse_all_channels(&self) -> ChannelBatch {
        let mut batch = ChannelBatch::default();
        for channel in Channel::all() {
            match self.parse_channel(channel) {
                Ok(series) => batch.series.push(series),
                Err(e) => {
                    log::info!("skipping {channel}: {e}");
                    batch.skipped.push((channel, e.to_string()));
                }
            }
        }
        batch
    }
}

/// Coerce two columns from `first_row` on, keeping rows where both are finite.
fn finite_pairs(table: &RawTable, first_row: usize, x_col: usize, y_col: usize) -> (Vec<f64>, Vec<f64>) {
    (first_row..table.row_count())
        .map(|r| (table.number(r, x_col), table.number(r, y_col)))
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(name: &str, csv: &str) -> Sheet {
        Sheet {
            name: name.to_string(),
            table: RawTable::from_csv_str("dls.csv", csv).unwrap(),
        }
    }

    const MULTI: &str = "\
Sample,Back Scatter,,,,,,MADLS,,,,,
,Intensity,,Number,,Volume,,Intensity,,Number,,Volume,
,Size (d.nm),Intensity (Percent),Size (d.nm),Number (Percent),Size (d.nm),Volume (Percent),Size (d.nm),Intensity (Percent),Size (d.nm),Number (Percent),Size (d.nm),Volume (Percent)
,nm,%,nm,%,nm,%,nm,%,nm,%,nm,%
,,,,,,,,,,,,
1,10,1,11,5,12,9,20,2,21,6,22,10
2,20,3,21,7,22,11,30,4,31,8,32,12
3,x,4,,,,,,,,,,
";

    #[test]
    fn detects_layouts() {
        assert_eq!(DlsLayout::detect(&sheet("s", MULTI).table), DlsLayout::MultiLevel);
        let single = sheet("s", "Diameter (nm),5 min\n1,2\n");
        assert_eq!(DlsLayout::detect(&single.table), DlsLayout::SingleLevel);
    }

    #[test]
    fn single_level_header_below_title_row() {
        let s = sheet(
            "Cond A",
            "Size distribution export,,\nDiameter (nm),5 min,30 min\n10,1,4\n20,2,\nbad,3,3\n30,1,2\n",
        );
        let parsed = SingleLevelSheet::new("dls.csv", &s).unwrap();
        assert_eq!(parsed.value_columns().collect::<Vec<_>>(), vec!["5 min", "30 min"]);

        let series = parsed.parse_column("30 min", None).unwrap();
        assert_eq!(series.diameters, vec![10.0, 30.0]);
        assert_eq!(series.values, vec![4.0, 2.0]);
        assert_eq!(series.tags.time_point.as_deref(), Some("30 min"));
        assert_eq!(series.tags.condition.as_deref(), Some("Cond A"));
        assert_eq!(series.label, "DLS");
    }

    #[test]
    fn single_level_unknown_column_is_malformed() {
        let s = sheet("s", "Diameter (nm),5 min\n10,1\n");
        let parsed = SingleLevelSheet::new("dls.csv", &s).unwrap();
        let err = parsed.parse_column("2 h", None).unwrap_err();
        assert!(err.to_string().contains("'2 h' not found"));
    }

    #[test]
    fn resolves_every_channel_to_its_own_pair() {
        let s = sheet("s", MULTI);
        let map = ColumnMap::resolve(&s.table);
        let bs = |w| Channel::new(ModeType::BackScatter, w);
        let madls = |w| Channel::new(ModeType::Madls, w);

        assert_eq!(map.get(bs(Weighting::Intensity)), Some(ColumnPair { diameter: 1, value: 2 }));
        assert_eq!(map.get(bs(Weighting::Number)), Some(ColumnPair { diameter: 3, value: 4 }));
        assert_eq!(map.get(bs(Weighting::Volume)), Some(ColumnPair { diameter: 5, value: 6 }));
        assert_eq!(map.get(madls(Weighting::Intensity)), Some(ColumnPair { diameter: 7, value: 8 }));
        assert_eq!(map.get(madls(Weighting::Volume)), Some(ColumnPair { diameter: 11, value: 12 }));
        assert_eq!(map.channels().count(), 6);
        assert_eq!(map.label(0), Some("sample"));
    }

    #[test]
    fn parses_channel_skipping_decorative_rows() {
        let s = sheet("Condition 1", MULTI);
        let parsed = MultiLevelSheet::new("dls.csv", &s);
        let series = parsed
            .parse_channel(Channel::new(ModeType::Madls, Weighting::Volume))
            .unwrap();
        assert_eq!(series.diameters, vec![22.0, 32.0]);
        assert_eq!(series.values, vec![10.0, 12.0]);
        assert_eq!(series.label, "DLS MADLS Volume-weighted");
        assert_eq!(series.tags.condition.as_deref(), Some("Condition 1"));
    }

    #[test]
    fn missing_channel_fails_interactively_but_is_skipped_in_batch() {
        let csv = "\
,Back Scatter,
,Intensity,
,Size (d.nm),Intensity (Percent)
,,
,,
,10,1
";
        let s = sheet("s", csv);
        let parsed = MultiLevelSheet::new("dls.csv", &s);
        let volume = Channel::new(ModeType::BackScatter, Weighting::Volume);

        let err = parsed.parse_channel(volume).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedInput { .. }));

        let batch = parsed.parse_all_channels();
        assert_eq!(batch.series.len(), 1);
        assert_eq!(batch.skipped.len(), 5);
        assert!(batch.skipped.iter().any(|(c, _)| *c == volume));
    }

    #[test]
    fn case_and_extra_words_are_tolerated() {
        let csv = "\
,MADLS result (averaged),
,NUMBER distribution,
,Particle SIZE d.nm,Number %
,,
,,
,5,1
,6,2
";
        let s = sheet("s", csv);
        let series = MultiLevelSheet::new("dls.csv", &s)
            .parse_channel(Channel::new(ModeType::Madls, Weighting::Number))
            .unwrap();
        assert_eq!(series.diameters, vec![5.0, 6.0]);
    }
}
