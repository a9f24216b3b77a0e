//! Round-trip consistency of a camera model over an image mask.
//!
//! Every active mask pixel is unprojected, normalized to a unit ray and projected
//! again. The distance between the pixel and its round-tripped position is the
//! reprojection residual. This measures how well the two directions of the model agree
//! with each other over the lens footprint; no independent 3D ground truth is involved.

pub mod mask;
pub mod statistics;

pub use mask::{Mask, MASK_FOREGROUND};
pub use statistics::ProjectionError;

use crate::camera::CameraModel;
use crate::geometry::{column_distances, normalize_columns};
use log::{debug, warn};
use nalgebra::DMatrix;

#[derive(thiserror::Error, Debug)]
pub enum EvaluationError {
    #[error("Mask has no active pixels")]
    EmptyMask,
}

/// Result of [`compute_round_trip_error`].
#[derive(Debug, Clone)]
pub struct RoundTripReport {
    /// Residual per pixel, same shape as the mask. Exactly 0 where the mask is 0.
    pub error_grid: DMatrix<f64>,
    pub statistics: ProjectionError,
}

/// Computes the inverse-then-forward projection residual of every active pixel in `mask`.
///
/// Pixels outside the model's valid domain get a `NaN` residual rather than an error,
/// which in turn shows up in the statistics.
///
/// Pixel coordinates are `u = column`, `v = row`, so `cx`/`fx` pair with image columns.
///
/// # Errors
///
/// * [`EvaluationError::EmptyMask`] - if no cell of `mask` is positive.
pub fn compute_round_trip_error<T>(
    mask: &Mask,
    camera_model: &T,
) -> Result<RoundTripReport, EvaluationError>
where
    T: ?Sized + CameraModel,
{
    let points_2d = mask.active_pixels();
    if points_2d.ncols() == 0 {
        return Err(EvaluationError::EmptyMask);
    }
    debug!(
        "Evaluating {} active pixels of a {}x{} mask",
        points_2d.ncols(),
        mask.width(),
        mask.height()
    );

    let rays = normalize_columns(&camera_model.unproject_points(&points_2d));
    let points_2d_projected = camera_model.project_points(&rays);
    let errors = column_distances(&points_2d, &points_2d_projected);

    let mut error_grid = DMatrix::zeros(mask.height(), mask.width());
    for (point, &error) in points_2d.column_iter().zip(errors.iter()) {
        // Coordinates came from mask indices, so the casts are exact.
        let (col, row) = (point[0] as usize, point[1] as usize);
        error_grid[(row, col)] = error;
    }

    let statistics =
        ProjectionError::from_residuals(&errors).ok_or(EvaluationError::EmptyMask)?;
    if statistics.non_finite > 0 {
        warn!(
            "{} of {} pixels have a non-finite round-trip residual",
            statistics.non_finite, statistics.count
        );
    }
    debug!("{:?}", statistics);

    Ok(RoundTripReport {
        error_grid,
        statistics,
    })
}
