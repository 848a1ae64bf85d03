use super::model::{NormalizedSeries, ResampledSeries};

/// Largest finite value, if any.
pub fn finite_max(values: &[f64]) -> Option<f64> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .reduce(f64::max)
}

/// Scale a series so its own peak becomes 1.
///
/// A series without finite values or with a non-positive maximum is
/// returned unchanged. NaN entries stay NaN.
pub fn normalize(series: ResampledSeries) -> NormalizedSeries {
    match finite_max(&series.values) {
        Some(peak) if peak > 0.0 => {
            let values = series.values.iter().map(|v| v / peak).collect();
            NormalizedSeries {
                series: ResampledSeries { values, ..series },
                peak: Some(peak),
            }
        }
        _ => {
            log::debug!("'{}': no positive peak, left unnormalised", series.label);
            NormalizedSeries { series, peak: None }
        }
    }
}
