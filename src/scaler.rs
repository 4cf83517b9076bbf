//! Per-column min-max scaling into [0, 1].
//!
//! The fit must come from the same dataset snapshot that the model is trained
//! on and queried against; the query vector is never scaled on its own.

use serde::{Deserialize, Serialize};

use crate::NUM_FEATURES;

/// Column ranges below this are treated as constant.
const MIN_RANGE: f64 = 1e-12;

/// Fitted min/max for each feature column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    pub mins: [f64; NUM_FEATURES],
    pub maxs: [f64; NUM_FEATURES],
}

impl MinMaxScaler {
    /// Fit column ranges from a feature matrix. An empty matrix yields a
    /// zero-width fit, which maps everything to 0.
    pub fn fit(rows: &[[f64; NUM_FEATURES]]) -> Self {
        if rows.is_empty() {
            return Self {
                mins: [0.0; NUM_FEATURES],
                maxs: [0.0; NUM_FEATURES],
            };
        }

        let mut mins = [f64::INFINITY; NUM_FEATURES];
        let mut maxs = [f64::NEG_INFINITY; NUM_FEATURES];
        for row in rows {
            for (d, &val) in row.iter().enumerate() {
                mins[d] = mins[d].min(val);
                maxs[d] = maxs[d].max(val);
            }
        }
        Self { mins, maxs }
    }

    /// Scale a single row. Zero-variance columns map to 0.
    pub fn transform_row(&self, row: &[f64; NUM_FEATURES]) -> [f64; NUM_FEATURES] {
        let mut out = [0.0; NUM_FEATURES];
        for d in 0..NUM_FEATURES {
            let range = self.maxs[d] - self.mins[d];
            out[d] = if range.abs() < MIN_RANGE {
                0.0
            } else {
                (row[d] - self.mins[d]) / range
            };
        }
        out
    }

    pub fn transform(&self, rows: &[[f64; NUM_FEATURES]]) -> Vec<[f64; NUM_FEATURES]> {
        rows.iter().map(|r| self.transform_row(r)).collect()
    }

    /// Whether two fits describe the same feature distribution.
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        self.mins
            .iter()
            .zip(&other.mins)
            .chain(self.maxs.iter().zip(&other.maxs))
            .all(|(a, b)| (a - b).abs() <= tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_transform_unit_range() {
        let rows = vec![
            [0.0, 0.2, 0.5, 1.0, 60.0],
            [0.5, 0.4, 0.5, 0.0, 120.0],
            [1.0, 0.6, 0.5, 0.5, 180.0],
        ];
        let scaler = MinMaxScaler::fit(&rows);
        let scaled = scaler.transform(&rows);

        assert_eq!(scaled[0][0], 0.0);
        assert_eq!(scaled[2][0], 1.0);
        assert!((scaled[1][1] - 0.5).abs() < 1e-12);
        assert!((scaled[1][4] - 0.5).abs() < 1e-12);
        assert_eq!(scaled[1][3], 0.0);

        for row in &scaled {
            for &v in row {
                assert!((0.0..=1.0).contains(&v));
            }
        }
    }

    #[test]
    fn test_zero_variance_column_maps_to_zero() {
        let rows = vec![[0.5, 0.1, 0.3, 0.3, 100.0], [0.5, 0.9, 0.4, 0.3, 100.0]];
        let scaler = MinMaxScaler::fit(&rows);
        let scaled = scaler.transform(&rows);
        for row in &scaled {
            assert_eq!(row[0], 0.0);
            assert_eq!(row[3], 0.0);
            assert_eq!(row[4], 0.0);
            assert!(row.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_empty_fit() {
        let scaler = MinMaxScaler::fit(&[]);
        assert_eq!(scaler.transform_row(&[1.0, 2.0, 3.0, 4.0, 5.0]), [0.0; NUM_FEATURES]);
    }

    #[test]
    fn test_approx_eq() {
        let a = MinMaxScaler::fit(&[[0.0; NUM_FEATURES], [1.0; NUM_FEATURES]]);
        let mut b = a.clone();
        assert!(a.approx_eq(&b, 1e-9));
        b.maxs[4] = 2.0;
        assert!(!a.approx_eq(&b, 1e-9));
    }
}
