/// Data layer: parsing, grid alignment, resampling and normalisation.
///
/// Architecture:
/// ```text
///  Archimedes .csv          DLS .xlsx / .csv
///        │                        │
///        ▼                        ▼
///   ┌────────────┐   ┌──────────────────────┐
///   │ archimedes │   │ dls (single / multi) │  → SizeSeries (nm)
///   └────────────┘   └──────────────────────┘
///        │                        │
///        └──────────┬─────────────┘
///                   ▼
///             ┌──────────┐
///             │   grid    │  union / reference axis
///             └──────────┘
///                   ▼
///             ┌──────────┐
///             │ resample  │  linear, NaN / zero outside range
///             └──────────┘
///                   ▼
///             ┌──────────┐
///             │ normalize │  divide by own peak
///             └──────────┘
///                   ▼
///             ┌──────────┐
///             │ pipeline  │  ComparisonTable + chart series
///             └──────────┘
/// ```

pub mod archimedes;
pub mod dls;
pub mod error;
pub mod grid;
pub mod loader;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod resample;
pub mod table;

pub use error::PipelineError;
