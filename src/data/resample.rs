use serde::{Deserialize, Serialize};

use super::model::{CommonGrid, ResampledSeries, SizeSeries};

/// Value given to grid points outside a series' measured diameter range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FillPolicy {
    /// Leave the point empty: absent from charts and ignored by normalisation.
    Nan,
    /// Drop to baseline so overlaid curves taper off.
    Zero,
}

impl FillPolicy {
    pub fn value(self) -> f64 {
        match self {
            FillPolicy::Nan => f64::NAN,
            FillPolicy::Zero => 0.0,
        }
    }
}

/// Sorted interpolation nodes built from one series.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpTable {
    xs: Vec<f64>,
    ys: Vec<f64>,
    collapsed: usize,
}

impl InterpTable {
    /// Nodes with a finite diameter, sorted ascending. Repeated diameters
    /// keep the value seen last in row order.
    pub fn from_series(series: &SizeSeries) -> Self {
        let mut nodes: Vec<(f64, f64)> = series.pairs().filter(|(x, _)| x.is_finite()).collect();
        // Stable sort keeps row order among equal diameters.
        nodes.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut xs: Vec<f64> = Vec::with_capacity(nodes.len());
        let mut ys: Vec<f64> = Vec::with_capacity(nodes.len());
        let mut collapsed = 0;
        for (x, y) in nodes {
            if xs.last() == Some(&x) {
                collapsed += 1;
                if let Some(last) = ys.last_mut() {
                    *last = y;
                }
            } else {
                xs.push(x);
                ys.push(y);
            }
        }
        InterpTable { xs, ys, collapsed }
    }

    /// Rows merged into an earlier node with the same diameter.
    pub fn collapsed(&self) -> usize {
        self.collapsed
    }

    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// Piecewise-linear value at `x`; `fill` outside `[min, max]`.
    pub fn eval(&self, x: f64, fill: f64) -> f64 {
        let (Some(&lo), Some(&hi)) = (self.xs.first(), self.xs.last()) else {
            return fill;
        };
        if x.is_nan() {
            return f64::NAN;
        }
        if x < lo || x > hi {
            return fill;
        }

        // First node strictly greater than x; x lies in [xs[i - 1], xs[i]).
        let i = self.xs.partition_point(|&node| node <= x);
        if i == 0 {
            return fill;
        }
        let (x0, y0) = (self.xs[i - 1], self.ys[i - 1]);
        if x == x0 || i == self.xs.len() {
            return y0;
        }
        let (x1, y1) = (self.xs[i], self.ys[i]);
        y0 + (y1 - y0) * (x - x0) / (x1 - x0)
    }
}

/// Evaluate `series` at every grid point by linear interpolation.
pub fn resample(series: &SizeSeries, grid: &CommonGrid, fill: FillPolicy) -> ResampledSeries {
    let table = InterpTable::from_series(series);
    if table.len() < series.len() {
        log::debug!(
            "'{}': {} of {} points collapsed or dropped before interpolation",
            series.label,
            series.len() - table.len(),
            series.len()
        );
    }

    let fill_value = fill.value();
    let values = grid
        .as_slice()
        .iter()
        .map(|&x| table.eval(x, fill_value))
        .collect();

    ResampledSeries {
        label: series.label.clone(),
        source: series.source,
        tags: series.tags.clone(),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Source;

    fn series(xs: &[f64], ys: &[f64]) -> SizeSeries {
        SizeSeries::new("s", Source::Dls, xs.to_vec(), ys.to_vec())
    }

    #[test]
    fn identity_at_existing_nodes() {
        let s = series(&[10.0, 20.0, 35.0, 50.0], &[3.0, -1.0, 7.5, 0.25]);
        let grid = CommonGrid::new(s.diameters.clone());
        let out = resample(&s, &grid, FillPolicy::Nan);
        assert_eq!(out.values, s.values);
    }

    #[test]
    fn linear_between_nodes() {
        let s = series(&[10.0, 30.0], &[2.0, 6.0]);
        let grid = CommonGrid::new(vec![15.0, 20.0, 25.0]);
        let out = resample(&s, &grid, FillPolicy::Nan);
        assert_eq!(out.values, vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn out_of_domain_follows_fill_policy() {
        let s = series(&[10.0, 20.0], &[1.0, 2.0]);
        let grid = CommonGrid::new(vec![5.0, 15.0, 25.0]);

        let nan = resample(&s, &grid, FillPolicy::Nan);
        assert!(nan.values[0].is_nan());
        assert_eq!(nan.values[1], 1.5);
        assert!(nan.values[2].is_nan());

        let zero = resample(&s, &grid, FillPolicy::Zero);
        assert_eq!(zero.values, vec![0.0, 1.5, 0.0]);
    }

    #[test]
    fn unsorted_source_is_sorted_first() {
        let s = series(&[30.0, 10.0, 20.0], &[3.0, 1.0, 2.0]);
        let grid = CommonGrid::new(vec![15.0, 25.0]);
        assert_eq!(resample(&s, &grid, FillPolicy::Nan).values, vec![1.5, 2.5]);
    }

    #[test]
    fn duplicate_diameters_keep_last_value() {
        let s = series(&[10.0, 20.0, 20.0, 30.0], &[0.0, 1.0, 5.0, 0.0]);
        let table = InterpTable::from_series(&s);
        assert_eq!(table.len(), 3);
        assert_eq!(table.eval(20.0, f64::NAN), 5.0);
        assert_eq!(table.collapsed(), 1);
    }

    #[test]
    fn nan_values_propagate_to_neighbouring_segments() {
        let s = series(&[10.0, 20.0, 30.0], &[1.0, f64::NAN, 3.0]);
        let grid = CommonGrid::new(vec![10.0, 15.0, 25.0, 30.0]);
        let out = resample(&s, &grid, FillPolicy::Zero);
        assert_eq!(out.values[0], 1.0);
        assert!(out.values[1].is_nan());
        assert!(out.values[2].is_nan());
        assert_eq!(out.values[3], 3.0);
    }

    #[test]
    fn empty_and_single_point_sources() {
        let grid = CommonGrid::new(vec![10.0, 20.0]);
        let empty = series(&[], &[]);
        assert_eq!(resample(&empty, &grid, FillPolicy::Zero).values, vec![0.0, 0.0]);

        let single = series(&[20.0], &[4.0]);
        assert_eq!(resample(&single, &grid, FillPolicy::Zero).values, vec![0.0, 4.0]);
    }
}
