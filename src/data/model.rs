use std::fmt;

use palette::Srgb;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Source / population / DLS channel tags
// ---------------------------------------------------------------------------

/// Which instrument a series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Source {
    Archimedes,
    Dls,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Archimedes => write!(f, "AM"),
            Source::Dls => write!(f, "DLS"),
        }
    }
}

/// Buoyancy population of an Archimedes measurement. Only affects labels
/// and colours, never the numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Population {
    Positive,
    Negative,
    Unlabeled,
}

impl Population {
    pub const ALL: [Population; 3] = [
        Population::Positive,
        Population::Negative,
        Population::Unlabeled,
    ];

    pub fn short_name(self) -> &'static str {
        match self {
            Population::Positive => "POS",
            Population::Negative => "NEG",
            Population::Unlabeled => "AM",
        }
    }
}

impl fmt::Display for Population {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Population::Positive => write!(f, "Positively Buoyant Particles"),
            Population::Negative => write!(f, "Negatively Buoyant Particles"),
            Population::Unlabeled => write!(f, "Particles"),
        }
    }
}

/// DLS optical / analysis mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModeType {
    BackScatter,
    Madls,
}

impl ModeType {
    pub const ALL: [ModeType; 2] = [ModeType::BackScatter, ModeType::Madls];

    /// Lowercase fragment identifying the mode in a composite header.
    pub fn needle(self) -> &'static str {
        match self {
            ModeType::BackScatter => "back",
            ModeType::Madls => "madls",
        }
    }
}

impl fmt::Display for ModeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModeType::BackScatter => write!(f, "Back scatter"),
            ModeType::Madls => write!(f, "MADLS"),
        }
    }
}

/// DLS distribution weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Weighting {
    Intensity,
    Number,
    Volume,
}

impl Weighting {
    pub const ALL: [Weighting; 3] = [Weighting::Intensity, Weighting::Number, Weighting::Volume];

    pub fn needle(self) -> &'static str {
        match self {
            Weighting::Intensity => "intensity",
            Weighting::Number => "number",
            Weighting::Volume => "volume",
        }
    }
}

impl fmt::Display for Weighting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Weighting::Intensity => write!(f, "Intensity-weighted"),
            Weighting::Number => write!(f, "Number-weighted"),
            Weighting::Volume => write!(f, "Volume-weighted"),
        }
    }
}

/// One (mode, weighting) pair of a DLS dataset, e.g. (MADLS, Volume).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Channel {
    pub mode: ModeType,
    pub weighting: Weighting,
}

impl Channel {
    pub const fn new(mode: ModeType, weighting: Weighting) -> Self {
        Channel { mode, weighting }
    }

    /// All six channels, back scatter first.
    pub fn all() -> impl Iterator<Item = Channel> {
        ModeType::ALL.into_iter().flat_map(|mode| {
            Weighting::ALL
                .into_iter()
                .map(move |weighting| Channel::new(mode, weighting))
        })
    }

    /// File-name friendly identifier, e.g. `madls_volume`.
    pub fn slug(self) -> String {
        let mode = match self.mode {
            ModeType::BackScatter => "backscatter",
            ModeType::Madls => "madls",
        };
        format!("{mode}_{}", self.weighting.needle())
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.mode, self.weighting)
    }
}

// ---------------------------------------------------------------------------
// SizeSeries – parsed (diameter, value) pairs
// ---------------------------------------------------------------------------

/// Descriptive tags carried along with a series for naming and styling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesTags {
    pub population: Option<Population>,
    pub channel: Option<Channel>,
    /// Time point such as `30min`, taken from a file name or a DLS column.
    pub time_point: Option<String>,
    /// DLS condition (workbook sheet name).
    pub condition: Option<String>,
}

/// A size distribution as parsed from one instrument export.
///
/// Diameters are in nanometres. They keep the source row order and are
/// only sorted when building an interpolation table.
#[derive(Debug, Clone, PartialEq)]
pub struct SizeSeries {
    pub diameters: Vec<f64>,
    /// Same length as `diameters`.
    pub values: Vec<f64>,
    pub label: String,
    pub source: Source,
    pub tags: SeriesTags,
}

impl SizeSeries {
    pub fn new(label: impl Into<String>, source: Source, diameters: Vec<f64>, values: Vec<f64>) -> Self {
        debug_assert_eq!(diameters.len(), values.len());
        SizeSeries {
            diameters,
            values,
            label: label.into(),
            source,
            tags: SeriesTags::default(),
        }
    }

    pub fn with_tags(mut self, tags: SeriesTags) -> Self {
        self.tags = tags;
        self
    }

    pub fn len(&self) -> usize {
        self.diameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diameters.is_empty()
    }

    /// Whether diameters are non-decreasing in row order.
    pub fn is_ascending(&self) -> bool {
        self.diameters.windows(2).all(|w| w[0] <= w[1])
    }

    /// Iterate `(diameter, value)` pairs.
    pub fn pairs(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.diameters.iter().copied().zip(self.values.iter().copied())
    }
}

// ---------------------------------------------------------------------------
// Grid-aligned series
// ---------------------------------------------------------------------------

/// Diameter axis shared by every resampled series.
///
/// Finite values only. Union grids are ascending and distinct; reference
/// grids keep the anchor series' own order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonGrid(Vec<f64>);

impl CommonGrid {
    pub(crate) fn new(diameters: Vec<f64>) -> Self {
        CommonGrid(diameters)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

/// A series evaluated at every point of a [`CommonGrid`].
#[derive(Debug, Clone, PartialEq)]
pub struct ResampledSeries {
    pub label: String,
    pub source: Source,
    pub tags: SeriesTags,
    /// One value per grid point.
    pub values: Vec<f64>,
}

/// A resampled series scaled by its own peak.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSeries {
    pub series: ResampledSeries,
    /// The divisor used, or `None` when normalisation was the identity
    /// (no finite values, or a non-positive maximum).
    pub peak: Option<f64>,
}

impl NormalizedSeries {
    pub fn values(&self) -> &[f64] {
        &self.series.values
    }
}

// ---------------------------------------------------------------------------
// ComparisonTable – row-aligned output
// ---------------------------------------------------------------------------

pub const DIAMETER_HEADER: &str = "Diameter (nm)";

#[derive(Debug, Clone, PartialEq)]
pub struct TableColumn {
    pub name: String,
    pub values: Vec<f64>,
}

/// Table keyed by grid diameter with one column per normalised series.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonTable {
    pub diameters: Vec<f64>,
    pub columns: Vec<TableColumn>,
}

impl ComparisonTable {
    pub fn row_count(&self) -> usize {
        self.diameters.len()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Value cells of row `i` in column order.
    pub fn row(&self, i: usize) -> Vec<f64> {
        self.columns.iter().map(|c| c.values[i]).collect()
    }
}

// ---------------------------------------------------------------------------
// Chart metadata handed to the presentation layer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineStyle {
    Solid,
    Dashed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Marker {
    Circle,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesStyle {
    pub color: Srgb<u8>,
    pub line: LineStyle,
    pub marker: Marker,
}

/// One drawable curve. NaN points are left out.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub name: String,
    pub source: Source,
    pub points: Vec<[f64; 2]>,
    pub style: SeriesStyle,
}
