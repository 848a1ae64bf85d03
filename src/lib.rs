//! Particle size distribution comparison between an Archimedes resonant
//! mass measurement and a DLS (dynamic light scattering) measurement.
//!
//! [`data`] parses both instruments' exports, aligns the series on a common
//! diameter grid and normalises them; [`export`] writes the results as
//! tables, charts and archives; [`color`] assigns the chart styling.

pub mod color;
pub mod data;
pub mod export;
