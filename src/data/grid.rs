use serde::{Deserialize, Serialize};

use super::error::{PipelineError, Result};
use super::model::{CommonGrid, SizeSeries};

/// How the common diameter axis is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridPolicy {
    /// Sorted union of every distinct diameter of the anchor series.
    Union,
    /// The first anchor series' own axis, unchanged.
    Reference,
}

/// Build the common grid from the anchor series.
pub fn build_grid(policy: GridPolicy, anchors: &[&SizeSeries]) -> Result<CommonGrid> {
    match policy {
        GridPolicy::Union => union_grid(anchors),
        GridPolicy::Reference => reference_grid(anchors),
    }
}

fn union_grid(anchors: &[&SizeSeries]) -> Result<CommonGrid> {
    let mut diameters: Vec<f64> = anchors
        .iter()
        .flat_map(|s| s.diameters.iter().copied())
        .filter(|d| d.is_finite())
        .collect();
    if diameters.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    diameters.sort_by(f64::total_cmp);
    diameters.dedup();
    Ok(CommonGrid::new(diameters))
}

/// Reference mode keeps the anchor's bins as they are. The anchor is the
/// first non-empty series.
fn reference_grid(anchors: &[&SizeSeries]) -> Result<CommonGrid> {
    let anchor = reference_anchor(anchors).ok_or(PipelineError::EmptyInput)?;

    let diameters: Vec<f64> = anchor
        .diameters
        .iter()
        .copied()
        .filter(|d| d.is_finite())
        .collect();
    if !anchor.is_ascending() {
        log::warn!(
            "reference series '{}' is not ascending; its axis is used as-is",
            anchor.label
        );
    }
    Ok(CommonGrid::new(diameters))
}

/// The series a reference grid is taken from.
pub fn reference_anchor<'a>(anchors: &[&'a SizeSeries]) -> Option<&'a SizeSeries> {
    anchors
        .iter()
        .copied()
        .find(|s| s.diameters.iter().any(|d| d.is_finite()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Source;

    fn series(diameters: &[f64]) -> SizeSeries {
        SizeSeries::new("s", Source::Archimedes, diameters.to_vec(), vec![1.0; diameters.len()])
    }

    #[test]
    fn union_sorts_and_deduplicates() {
        let a = series(&[10.0, 20.0, 30.0]);
        let b = series(&[40.0, 30.0, 20.0, f64::NAN]);
        let grid = build_grid(GridPolicy::Union, &[&a, &b]).unwrap();
        assert_eq!(grid.as_slice(), &[10.0, 20.0, 30.0, 40.0]);
    }

    #[test]
    fn reference_reuses_the_anchor_axis() {
        let a = series(&[10.0, 20.0, 30.0]);
        let b = series(&[5.0, 50.0]);
        let grid = build_grid(GridPolicy::Reference, &[&a, &b]).unwrap();
        assert_eq!(grid.as_slice(), &[10.0, 20.0, 30.0]);
    }

    #[test]
    fn reference_skips_empty_anchors() {
        let empty = series(&[]);
        let b = series(&[5.0, 50.0]);
        let grid = build_grid(GridPolicy::Reference, &[&empty, &b]).unwrap();
        assert_eq!(grid.as_slice(), &[5.0, 50.0]);
    }

    #[test]
    fn empty_inputs_fail() {
        let empty = series(&[]);
        for policy in [GridPolicy::Union, GridPolicy::Reference] {
            assert!(matches!(build_grid(policy, &[]), Err(PipelineError::EmptyInput)));
            assert!(matches!(build_grid(policy, &[&empty]), Err(PipelineError::EmptyInput)));
        }
    }
}
