//! Double Sphere Check
//!
//! Validates Double Sphere fisheye camera parameters by round-tripping every pixel of
//! an image mask through unprojection and projection and reporting the residuals.
//!
//! - [`camera`]: the [`CameraModel`] trait and the [`DoubleSphereModel`]
//! - [`evaluation`]: masks, the per-pixel error grid and its statistics
//! - [`util`]: mask loading/thresholding, heatmap rendering and result export

pub mod camera;
pub mod evaluation;
pub mod geometry;
pub mod util;

// Re-export commonly used types
pub use camera::{CameraModel, CameraModelError, DoubleSphereModel, Intrinsics, Resolution};

pub use evaluation::{
    compute_round_trip_error, EvaluationError, Mask, ProjectionError, RoundTripReport,
};
