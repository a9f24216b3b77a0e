//! Implements the Double Sphere camera model.
//!
//! The model (Usenko et al., "The Double Sphere Camera Model", 3DV 2018) projects a
//! point onto two unit spheres whose centres are shifted by `chi` along the optical
//! axis, then onto the image plane of a pinhole shifted by `alpha / (1 - alpha)`.
//!
//! ```text
//! d1    = sqrt(x² + y² + z²)
//! d2    = sqrt(x² + y² + (chi·d1 + z)²)
//! denom = alpha·d2 + (1 − alpha)·(chi·d1 + z)
//! u     = fx·x/denom + cx
//! v     = fy·y/denom + cy
//! ```
//!
//! Unprojection is closed form. Neither direction clamps or rejects points: outside the
//! valid domain the square roots go negative and the result is `NaN`.

use crate::camera::{validation, CameraModel, CameraModelError, Intrinsics, Resolution};
use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use yaml_rust::YamlLoader;

/// Number of scalars in the flat parameter vector `[chi, alpha, fx, fy, cx, cy]`.
pub const NUM_PARAMETERS: usize = 6;

/// Represents a Double Sphere camera model.
///
/// # Examples
///
/// ```rust
/// use double_sphere_check::camera::{CameraModel, DoubleSphereModel};
/// use nalgebra::Vector3;
///
/// let model = DoubleSphereModel::new(&[0.0, 0.5, 100.0, 100.0, 50.0, 50.0]).unwrap();
/// let pixel = model.project(&Vector3::new(0.0, 0.0, 1.0));
/// assert_eq!(pixel.x, 50.0);
/// assert_eq!(pixel.y, 50.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoubleSphereModel {
    pub intrinsics: Intrinsics,
    /// Image size the parameters were calibrated for; 0x0 when unknown.
    pub resolution: Resolution,
    /// Shift between the two sphere centres (often written ξ).
    pub chi: f64,
    pub alpha: f64,
}

impl DoubleSphereModel {
    /// Creates a model from `[chi, alpha, fx, fy, cx, cy]`.
    ///
    /// The resolution is initialized to 0x0.
    ///
    /// # Errors
    ///
    /// * [`CameraModelError::WrongParameterCount`] if `parameters` does not hold exactly six values.
    /// * Any error of [`DoubleSphereModel::validate_params`].
    pub fn new(parameters: &[f64]) -> Result<Self, CameraModelError> {
        let [chi, alpha, fx, fy, cx, cy]: [f64; NUM_PARAMETERS] =
            parameters
                .try_into()
                .map_err(|_| CameraModelError::WrongParameterCount {
                    expected: NUM_PARAMETERS,
                    found: parameters.len(),
                })?;

        let model = DoubleSphereModel {
            intrinsics: Intrinsics { fx, fy, cx, cy },
            resolution: Resolution {
                width: 0,
                height: 0,
            },
            chi,
            alpha,
        };

        model.validate_params()?;
        Ok(model)
    }

    /// Returns the parameters in construction order `[chi, alpha, fx, fy, cx, cy]`.
    pub fn parameters(&self) -> [f64; NUM_PARAMETERS] {
        [
            self.chi,
            self.alpha,
            self.intrinsics.fx,
            self.intrinsics.fy,
            self.intrinsics.cx,
            self.intrinsics.cy,
        ]
    }

    /// Largest squared normalized radius `r²` such that every pixel closer to the
    /// principal point can be unprojected.
    ///
    /// Two radicands must stay non-negative:
    /// * `1 − (2α − 1)·r²`, which bounds `r²` when `α > 0.5`;
    /// * `mz² + (1 − chi²)·r²`, which can only go negative when `|chi| > 1`.
    ///
    /// The second bound has no closed form for `α ≠ 0` and is found by bisection.
    /// `mz` reaches 0 at `r² = 1/α²`, where the radicand is already negative.
    pub fn max_valid_r2(&self) -> f64 {
        let alpha_bound = if self.alpha > 0.5 {
            1.0 / (2.0 * self.alpha - 1.0)
        } else {
            f64::INFINITY
        };
        if self.chi.abs() <= 1.0 {
            return alpha_bound;
        }
        if self.alpha == 0.0 {
            // mz == 1 everywhere.
            return (1.0 / (self.chi * self.chi - 1.0)).min(alpha_bound);
        }

        let upper = (1.0 / (self.alpha * self.alpha)).min(alpha_bound);
        if self.chi_radicand(upper) >= 0.0 {
            return alpha_bound;
        }

        let (mut lo, mut hi) = (0.0, upper);
        for _ in 0..100 {
            let mid = 0.5 * (lo + hi);
            // NaN compares false and moves the upper end down.
            if self.chi_radicand(mid) >= 0.0 {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        lo
    }

    /// `mz² + (1 − chi²)·r²` for a squared normalized radius.
    fn chi_radicand(&self, r_squared: f64) -> f64 {
        let alpha = self.alpha;
        let mz = (1.0 - alpha * alpha * r_squared)
            / (alpha * (1.0 - (2.0 * alpha - 1.0) * r_squared).sqrt() + (1.0 - alpha));
        mz * mz + (1.0 - self.chi * self.chi) * r_squared
    }

    /// Whether `point_2d` unprojects to a finite ray.
    pub fn is_in_domain(&self, point_2d: &Vector2<f64>) -> bool {
        self.unproject(point_2d).iter().all(|v| v.is_finite())
    }

    /// Loads a model from a Kalibr-style YAML file.
    ///
    /// The expected layout is
    ///
    /// ```yaml
    /// cam0:
    ///   camera_model: double_sphere
    ///   intrinsics: [fx, fy, cx, cy, xi, alpha]
    ///   resolution: [width, height]
    /// ```
    pub fn load_from_yaml(path: &str) -> Result<Self, CameraModelError> {
        let contents = fs::read_to_string(path)?;
        let docs = YamlLoader::load_from_str(&contents)?;

        if docs.is_empty() {
            return Err(CameraModelError::InvalidParams(
                "Empty YAML document".to_string(),
            ));
        }

        let doc = &docs[0];

        let intrinsics = doc["cam0"]["intrinsics"]
            .as_vec()
            .ok_or_else(|| CameraModelError::InvalidParams("Invalid intrinsics".to_string()))?;
        if intrinsics.len() != NUM_PARAMETERS {
            return Err(CameraModelError::WrongParameterCount {
                expected: NUM_PARAMETERS,
                found: intrinsics.len(),
            });
        }

        // yaml-rust only yields f64 for real literals, so accept integers as well.
        let values = intrinsics
            .iter()
            .map(|v| v.as_f64().or_else(|| v.as_i64().map(|i| i as f64)))
            .collect::<Option<Vec<f64>>>()
            .ok_or_else(|| {
                CameraModelError::InvalidParams("Intrinsics must be numbers".to_string())
            })?;

        let resolution = match doc["cam0"]["resolution"].as_vec() {
            Some(resolution) if resolution.len() == 2 => Resolution {
                width: resolution[0]
                    .as_i64()
                    .ok_or_else(|| CameraModelError::InvalidParams("Invalid width".to_string()))?
                    as u32,
                height: resolution[1]
                    .as_i64()
                    .ok_or_else(|| CameraModelError::InvalidParams("Invalid height".to_string()))?
                    as u32,
            },
            Some(_) => {
                return Err(CameraModelError::InvalidParams(
                    "Invalid resolution".to_string(),
                ))
            }
            None => Resolution {
                width: 0,
                height: 0,
            },
        };

        // File order is fx, fy, cx, cy, xi, alpha.
        let mut model = DoubleSphereModel::new(&[
            values[4], values[5], values[0], values[1], values[2], values[3],
        ])?;
        model.resolution = resolution;
        Ok(model)
    }

    /// Saves the model in the layout read by [`DoubleSphereModel::load_from_yaml`].
    pub fn save_to_yaml(&self, path: &str) -> Result<(), CameraModelError> {
        let mut cam0 = serde_yaml::Mapping::new();
        cam0.insert(
            serde_yaml::Value::String("camera_model".to_string()),
            serde_yaml::Value::String("double_sphere".to_string()),
        );
        cam0.insert(
            serde_yaml::Value::String("intrinsics".to_string()),
            serde_yaml::to_value(vec![
                self.intrinsics.fx,
                self.intrinsics.fy,
                self.intrinsics.cx,
                self.intrinsics.cy,
                self.chi,
                self.alpha,
            ])
            .map_err(|e| CameraModelError::YamlError(e.to_string()))?,
        );
        cam0.insert(
            serde_yaml::Value::String("resolution".to_string()),
            serde_yaml::to_value(vec![self.resolution.width, self.resolution.height])
                .map_err(|e| CameraModelError::YamlError(e.to_string()))?,
        );

        let mut root = serde_yaml::Mapping::new();
        root.insert(
            serde_yaml::Value::String("cam0".to_string()),
            serde_yaml::Value::Mapping(cam0),
        );

        let yaml_string = serde_yaml::to_string(&serde_yaml::Value::Mapping(root))
            .map_err(|e| CameraModelError::YamlError(e.to_string()))?;

        let mut file = fs::File::create(path)?;
        file.write_all(yaml_string.as_bytes())?;

        Ok(())
    }
}

impl CameraModel for DoubleSphereModel {
    fn project(&self, point_3d: &Vector3<f64>) -> Vector2<f64> {
        let x = point_3d.x;
        let y = point_3d.y;
        let z = point_3d.z;

        let r_squared = (x * x) + (y * y);
        let d1 = (r_squared + (z * z)).sqrt();
        let gamma = self.chi * d1 + z;
        let d2 = (r_squared + gamma * gamma).sqrt();

        let denom = self.alpha * d2 + (1.0 - self.alpha) * gamma;

        Vector2::new(
            self.intrinsics.fx * (x / denom) + self.intrinsics.cx,
            self.intrinsics.fy * (y / denom) + self.intrinsics.cy,
        )
    }

    fn unproject(&self, point_2d: &Vector2<f64>) -> Vector3<f64> {
        let Intrinsics { fx, fy, cx, cy } = self.intrinsics;
        let alpha = self.alpha;
        let chi = self.chi;

        let mx = (point_2d.x - cx) / fx;
        let my = (point_2d.y - cy) / fy;
        let r_squared = (mx * mx) + (my * my);

        let mz = (1.0 - alpha * alpha * r_squared)
            / (alpha * (1.0 - (2.0 * alpha - 1.0) * r_squared).sqrt() + (1.0 - alpha));
        let mz_squared = mz * mz;

        let coeff = (mz * chi + (mz_squared + (1.0 - chi * chi) * r_squared).sqrt())
            / (mz_squared + r_squared);

        Vector3::new(coeff * mx, coeff * my, coeff * mz - chi)
    }

    /// Checks that the intrinsics are usable and that `chi` and `alpha` are finite.
    ///
    /// `alpha` is not limited to `(0, 1]`; `chi = alpha = 0` is the pinhole case.
    fn validate_params(&self) -> Result<(), CameraModelError> {
        validation::validate_intrinsics(&self.intrinsics)?;

        if !self.chi.is_finite() {
            return Err(CameraModelError::InvalidParams(
                "chi must be finite".to_string(),
            ));
        }

        if !self.alpha.is_finite() {
            return Err(CameraModelError::InvalidParams(
                "alpha must be finite".to_string(),
            ));
        }

        Ok(())
    }

    fn get_intrinsics(&self) -> Intrinsics {
        self.intrinsics.clone()
    }

    fn get_distortion(&self) -> Vec<f64> {
        vec![self.chi, self.alpha]
    }
}
