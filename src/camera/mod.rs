//! Camera model abstractions.
//!
//! This module defines the [`CameraModel`] trait shared by projection models, the
//! [`Intrinsics`] container and the [`CameraModelError`] type. The only concrete model
//! shipped is the [`DoubleSphereModel`].

pub mod double_sphere;

pub use double_sphere::DoubleSphereModel;

use nalgebra::{DMatrix, Matrix2xX, Matrix3xX, Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// Focal lengths and principal point, in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

#[derive(thiserror::Error, Debug)]
pub enum CameraModelError {
    #[error("Expected {expected} camera parameters, got {found}")]
    WrongParameterCount { expected: usize, found: usize },
    #[error("Expected a point batch with {expected} columns, got {found}")]
    InvalidShape { expected: usize, found: usize },
    #[error("Focal length must be positive")]
    FocalLengthMustBePositive,
    #[error("Principal point must be finite")]
    PrincipalPointMustBeFinite,
    #[error("Invalid camera parameters: {0}")]
    InvalidParams(String),
    #[error("Failed to load YAML: {0}")]
    YamlError(String),
    #[error("IO Error: {0}")]
    IOError(String),
}

impl From<std::io::Error> for CameraModelError {
    fn from(err: std::io::Error) -> Self {
        CameraModelError::IOError(err.to_string())
    }
}

impl From<yaml_rust::ScanError> for CameraModelError {
    fn from(err: yaml_rust::ScanError) -> Self {
        CameraModelError::YamlError(err.to_string())
    }
}

/// Trait defining the core functionality for camera models.
///
/// `project` and `unproject` never fail: geometry outside the model's valid domain
/// comes back as `NaN` or `±inf` components so that one bad point does not abort a
/// whole batch.
pub trait CameraModel {
    /// Project a 3D ray direction to 2D pixel coordinates.
    fn project(&self, point_3d: &Vector3<f64>) -> Vector2<f64>;

    /// Unproject 2D pixel coordinates to a 3D ray (not unit length in general).
    fn unproject(&self, point_2d: &Vector2<f64>) -> Vector3<f64>;

    /// Validate camera parameters.
    fn validate_params(&self) -> Result<(), CameraModelError>;

    fn get_intrinsics(&self) -> Intrinsics;

    fn get_distortion(&self) -> Vec<f64>;

    /// Project every column of `points_3d`.
    fn project_points(&self, points_3d: &Matrix3xX<f64>) -> Matrix2xX<f64> {
        let mut points_2d = Matrix2xX::zeros(points_3d.ncols());
        for (i, point_3d) in points_3d.column_iter().enumerate() {
            points_2d.set_column(i, &self.project(&point_3d.into_owned()));
        }
        points_2d
    }

    /// Unproject every column of `points_2d`.
    fn unproject_points(&self, points_2d: &Matrix2xX<f64>) -> Matrix3xX<f64> {
        let mut points_3d = Matrix3xX::zeros(points_2d.ncols());
        for (i, point_2d) in points_2d.column_iter().enumerate() {
            points_3d.set_column(i, &self.unproject(&point_2d.into_owned()));
        }
        points_3d
    }

    /// Project an N×3 row matrix of rays into an N×2 row matrix of pixels.
    fn project_rows(&self, rays: &DMatrix<f64>) -> Result<DMatrix<f64>, CameraModelError> {
        if rays.ncols() != 3 {
            return Err(CameraModelError::InvalidShape {
                expected: 3,
                found: rays.ncols(),
            });
        }
        let points_3d = Matrix3xX::from_fn(rays.nrows(), |r, c| rays[(c, r)]);
        let points_2d = self.project_points(&points_3d);
        Ok(DMatrix::from_fn(rays.nrows(), 2, |r, c| points_2d[(c, r)]))
    }

    /// Unproject an N×2 row matrix of pixels into an N×3 row matrix of rays.
    fn unproject_rows(&self, pixels: &DMatrix<f64>) -> Result<DMatrix<f64>, CameraModelError> {
        if pixels.ncols() != 2 {
            return Err(CameraModelError::InvalidShape {
                expected: 2,
                found: pixels.ncols(),
            });
        }
        let points_2d = Matrix2xX::from_fn(pixels.nrows(), |r, c| pixels[(c, r)]);
        let points_3d = self.unproject_points(&points_2d);
        Ok(DMatrix::from_fn(pixels.nrows(), 3, |r, c| points_3d[(c, r)]))
    }
}

/// Common validation functions for camera parameters
pub mod validation {
    use super::*;

    pub fn validate_intrinsics(intrinsics: &Intrinsics) -> Result<(), CameraModelError> {
        // Comparisons are false for NaN, so NaN focal lengths are rejected here too.
        let focal_ok = intrinsics.fx > 0.0
            && intrinsics.fy > 0.0
            && intrinsics.fx.is_finite()
            && intrinsics.fy.is_finite();
        if !focal_ok {
            return Err(CameraModelError::FocalLengthMustBePositive);
        }
        if !intrinsics.cx.is_finite() || !intrinsics.cy.is_finite() {
            return Err(CameraModelError::PrincipalPointMustBeFinite);
        }
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_validate_intrinsics() {
            let mut intrinsics = Intrinsics {
                fx: 100.0,
                fy: 100.0,
                cx: 50.0,
                cy: 50.0,
            };
            assert!(validate_intrinsics(&intrinsics).is_ok());

            intrinsics.fy = f64::NAN;
            assert!(matches!(
                validate_intrinsics(&intrinsics),
                Err(CameraModelError::FocalLengthMustBePositive)
            ));

            intrinsics.fy = 100.0;
            intrinsics.cx = f64::INFINITY;
            assert!(matches!(
                validate_intrinsics(&intrinsics),
                Err(CameraModelError::PrincipalPointMustBeFinite)
            ));
        }
    }
}
