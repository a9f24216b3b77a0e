//! Column-wise helpers over point batches.
//!
//! Every point is handled independently of the others, so none of these functions
//! depends on column order.

use nalgebra::{Matrix2xX, Matrix3xX};

/// Scales every column of `points` to unit Euclidean length.
///
/// A zero column becomes `NaN` (0 / 0) instead of panicking.
pub fn normalize_columns(points: &Matrix3xX<f64>) -> Matrix3xX<f64> {
    let mut normalized = points.clone();
    for mut column in normalized.column_iter_mut() {
        let norm = column.norm();
        column /= norm;
    }
    normalized
}

/// Euclidean distance between matching columns of `a` and `b`.
///
/// # Panics
///
/// Panics if the two batches hold a different number of points.
pub fn column_distances(a: &Matrix2xX<f64>, b: &Matrix2xX<f64>) -> Vec<f64> {
    assert_eq!(a.ncols(), b.ncols(), "point batches differ in length");
    a.column_iter()
        .zip(b.column_iter())
        .map(|(p, q)| (p - q).norm())
        .collect()
}
