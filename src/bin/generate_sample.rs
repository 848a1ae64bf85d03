//! Writes a synthetic set of Archimedes and DLS exports for trying the app:
//!
//! ```text
//! cargo run --bin generate_sample -- [output_dir]
//! ```

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};

use am_dls_compare::data::archimedes::{ARCHIMEDES_HEADER_LINES, BIN_CENTER};
use am_dls_compare::data::model::{Channel, ModeType, Weighting};

/// Log-normal shaped peak: a gaussian over `ln(x)`.
fn log_gaussian(x: f64, mode: f64, width: f64, amplitude: f64) -> f64 {
    amplitude * (-(x.ln() - mode.ln()).powi(2) / (2.0 * width.powi(2))).exp()
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

// ---------------------------------------------------------------------------
// Archimedes
// ---------------------------------------------------------------------------

/// Archimedes export: metadata block, then `Bin Center` (µm) and `Average`.
fn archimedes_export(rng: &mut SimpleRng, mode_um: f64, amplitude: f64) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Archimedes Particle Metrology System,Export");
    for i in 1..ARCHIMEDES_HEADER_LINES {
        let _ = writeln!(out, "Setting {i},value {i}");
    }
    let _ = writeln!(out, "Bin Index,{BIN_CENTER},Average,Std Dev");

    for i in 0..96 {
        let bin_um = 0.1 + i as f64 * 0.02;
        let signal = log_gaussian(bin_um, mode_um, 0.35, amplitude);
        let conc = (signal + rng.gauss(0.0, amplitude * 0.02)).max(0.0);
        let _ = writeln!(out, "{i},{bin_um:.3},{conc:.2},{:.2}", conc * 0.1);
    }
    let _ = writeln!(out, "Total,,,");
    out
}

// ---------------------------------------------------------------------------
// DLS
// ---------------------------------------------------------------------------

fn dls_diameters() -> Vec<f64> {
    // 1 nm .. 10 µm, log-spaced like the instrument's size classes.
    (0..70).map(|i| 10f64.powf(i as f64 * 4.0 / 69.0)).collect()
}

/// Single-level sheet: title row, `Diameter (nm)` header, one column per time point.
fn write_single_level(path: &Path, rng: &mut SimpleRng) -> Result<()> {
    let time_points = [("5 min", 380.0), ("30 min", 450.0), ("24h", 620.0)];
    let mut writer = csv::Writer::from_path(path)?;

    let mut title = vec!["Size distribution by intensity".to_string()];
    title.extend(time_points.iter().map(|_| String::new()));
    writer.write_record(&title)?;

    let mut header = vec!["Diameter (nm)".to_string()];
    header.extend(time_points.iter().map(|(tp, _)| tp.to_string()));
    writer.write_record(&header)?;

    for d in dls_diameters() {
        let mut record = vec![format!("{d:.2}")];
        for &(_, mode) in &time_points {
            let v = (log_gaussian(d, mode, 0.3, 12.0) + rng.gauss(0.0, 0.05)).max(0.0);
            record.push(format!("{v:.3}"));
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Multi-level sheet: mode / weighting / quantity header rows, a units row
/// and a run row, then size + percent column pairs for every channel.
fn write_multi_level(path: &Path, rng: &mut SimpleRng) -> Result<()> {
    let channels: Vec<Channel> = Channel::all().collect();
    let mut writer = csv::Writer::from_path(path)?;

    let mut modes = vec!["Record".to_string()];
    let mut weightings = vec![String::new()];
    let mut quantities = vec![String::new()];
    let mut units = vec![String::new()];
    let mut run = vec!["Run 1".to_string()];
    for (i, channel) in channels.iter().enumerate() {
        let first_of_mode = i == 0 || channels[i - 1].mode != channel.mode;
        modes.push(if first_of_mode { mode_title(channel.mode).to_string() } else { String::new() });
        modes.push(String::new());
        weightings.push(weighting_title(channel.weighting).to_string());
        weightings.push(String::new());
        quantities.push("Size (d.nm)".to_string());
        quantities.push(format!("{} (Percent)", weighting_title(channel.weighting)));
        units.push("nm".to_string());
        units.push("%".to_string());
        run.push(String::new());
        run.push(String::new());
    }
    for row in [&modes, &weightings, &quantities, &units, &run] {
        writer.write_record(row)?;
    }

    let diameters = dls_diameters();
    for (row_no, &d) in diameters.iter().enumerate() {
        let mut record = vec![(row_no + 1).to_string()];
        for channel in &channels {
            let mode = match channel.weighting {
                Weighting::Intensity => 460.0,
                Weighting::Volume => 410.0,
                Weighting::Number => 320.0,
            };
            let width = match channel.mode {
                ModeType::BackScatter => 0.32,
                ModeType::Madls => 0.26,
            };
            let v = (log_gaussian(d, mode, width, 9.0) + rng.gauss(0.0, 0.04)).max(0.0);
            record.push(format!("{d:.2}"));
            record.push(format!("{v:.3}"));
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn mode_title(mode: ModeType) -> &'static str {
    match mode {
        ModeType::BackScatter => "Back Scatter",
        ModeType::Madls => "MADLS",
    }
}

fn weighting_title(weighting: Weighting) -> &'static str {
    match weighting {
        Weighting::Intensity => "Intensity",
        Weighting::Number => "Number",
        Weighting::Volume => "Volume",
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let out_dir = std::env::args().nth(1).unwrap_or_else(|| "sample_data".to_string());
    let out_dir = Path::new(&out_dir);
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let mut rng = SimpleRng::new(42);

    let archimedes = [
        ("POS 5min 2mgml.csv", 0.38, 900.0),
        ("POS 30min 2mgml.csv", 0.42, 1200.0),
        ("NEG 5min 2mgml.csv", 0.55, 400.0),
        ("NEG 30min 2mgml.csv", 0.60, 650.0),
    ];
    for (name, mode_um, amplitude) in archimedes {
        let path = out_dir.join(name);
        std::fs::write(&path, archimedes_export(&mut rng, mode_um, amplitude))
            .with_context(|| format!("writing {}", path.display()))?;
    }

    write_single_level(&out_dir.join("DLS single-level.csv"), &mut rng)?;
    write_multi_level(&out_dir.join("DLS multi-level.csv"), &mut rng)?;

    println!(
        "Wrote {} Archimedes exports and 2 DLS exports to {}",
        archimedes.len(),
        out_dir.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use am_dls_compare::data::archimedes::parse_archimedes;
    use am_dls_compare::data::dls::{DlsLayout, MultiLevelSheet};
    use am_dls_compare::data::loader::load_dls_workbook;
    use am_dls_compare::data::model::Population;

    #[test]
    fn archimedes_export_parses() {
        let mut rng = SimpleRng::new(1);
        let text = archimedes_export(&mut rng, 0.4, 100.0);
        let series = parse_archimedes("POS 5min.csv", &text, Population::Positive).unwrap();
        assert_eq!(series.len(), 96);
        assert!((series.diameters[0] - 100.0).abs() < 1e-9);
        assert!(series.is_ascending());
    }

    #[test]
    fn multi_level_export_carries_every_channel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("multi.csv");
        write_multi_level(&path, &mut SimpleRng::new(2)).unwrap();

        let workbook = load_dls_workbook(&path).unwrap();
        let sheet = &workbook.sheets[0];
        assert_eq!(DlsLayout::detect(&sheet.table), DlsLayout::MultiLevel);
        let batch = MultiLevelSheet::new(&workbook.name, sheet).parse_all_channels();
        assert_eq!(batch.series.len(), 6);
        assert!(batch.skipped.is_empty());
        assert!(batch.series.iter().all(|s| s.len() == 70));
    }
}
