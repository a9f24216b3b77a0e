use serde::{Deserialize, Serialize};
use std::fmt;

/// Summary statistics over a set of reprojection residuals, in pixels.
///
/// A single `NaN` residual makes every statistic `NaN`; infinite residuals propagate
/// through the arithmetic as usual. Either way a caller can spot out-of-domain pixels
/// from the summary alone. Serialized non-finite values are written as the strings
/// `"NaN"`, `"inf"` and `"-inf"`.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionError {
    #[serde(with = "non_finite_f64")]
    pub rmse: f64,
    #[serde(with = "non_finite_f64")]
    pub min: f64,
    #[serde(with = "non_finite_f64")]
    pub max: f64,
    #[serde(with = "non_finite_f64")]
    pub mean: f64,
    /// Sample standard deviation (n − 1 denominator).
    #[serde(with = "non_finite_f64")]
    pub stddev: f64,
    #[serde(with = "non_finite_f64")]
    pub median: f64,
    /// Number of residuals summarised.
    pub count: usize,
    /// Number of residuals that are `NaN` or infinite.
    pub non_finite: usize,
}

impl fmt::Debug for ProjectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Projection Error [ rmse: {}, min: {}, max: {}, mean: {}, stddev: {}, median: {}, count: {}, non_finite: {} ]",
            self.rmse, self.min, self.max, self.mean, self.stddev, self.median, self.count, self.non_finite
        )
    }
}

impl ProjectionError {
    /// Summarises `errors`. Returns `None` for an empty slice.
    pub fn from_residuals(errors: &[f64]) -> Option<Self> {
        if errors.is_empty() {
            return None;
        }

        let count = errors.len();
        let n = count as f64;
        let non_finite = errors.iter().filter(|e| !e.is_finite()).count();

        let sum: f64 = errors.iter().sum();
        let mean = sum / n;

        let stddev = if count > 1 {
            let variance = errors.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
            variance.sqrt()
        } else {
            0.0
        };

        let sum_squared: f64 = errors.iter().map(|x| x.powi(2)).sum();
        let rmse = (sum_squared / n).sqrt();

        // f64::min/max silently skip NaN, so check for it up front.
        let has_nan = errors.iter().any(|e| e.is_nan());
        let (min, max, median) = if has_nan {
            (f64::NAN, f64::NAN, f64::NAN)
        } else {
            let min = errors.iter().fold(f64::INFINITY, |a, &b| a.min(b));
            let max = errors.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));

            let mut sorted_errors = errors.to_vec();
            sorted_errors.sort_by(f64::total_cmp);
            let mid = count / 2;
            let median = if count % 2 == 0 {
                (sorted_errors[mid - 1] + sorted_errors[mid]) / 2.0
            } else {
                sorted_errors[mid]
            };
            (min, max, median)
        };

        Some(ProjectionError {
            rmse,
            min,
            max,
            mean,
            stddev,
            median,
            count,
            non_finite,
        })
    }

    /// True when every statistic is a finite number.
    pub fn is_finite(&self) -> bool {
        self.non_finite == 0
    }
}

/// Serde adapter keeping `NaN` and `±inf` distinguishable in formats such as JSON,
/// which have no literal for them.
mod non_finite_f64 {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            // "NaN", "inf" or "-inf"
            serializer.serialize_str(&value.to_string())
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        match NumberOrText::deserialize(deserializer)? {
            NumberOrText::Number(value) => Ok(value),
            NumberOrText::Text(text) => match text.as_str() {
                "NaN" => Ok(f64::NAN),
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                other => Err(de::Error::invalid_value(
                    de::Unexpected::Str(other),
                    &"a number, \"NaN\", \"inf\" or \"-inf\"",
                )),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_statistics_of_known_residuals() {
        let stats = ProjectionError::from_residuals(&[1.0, 2.0, 3.0, 4.0]).unwrap();

        assert_eq!(stats.count, 4);
        assert_eq!(stats.non_finite, 0);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.median, 2.5);
        assert_relative_eq!(stats.stddev, (5.0_f64 / 3.0).sqrt(), epsilon = 1e-12);
        assert_relative_eq!(stats.rmse, 7.5_f64.sqrt(), epsilon = 1e-12);
        assert!(stats.is_finite());
    }

    #[test]
    fn test_single_residual() {
        let stats = ProjectionError::from_residuals(&[0.25]).unwrap();

        assert_eq!(stats.min, 0.25);
        assert_eq!(stats.max, 0.25);
        assert_eq!(stats.median, 0.25);
        assert_eq!(stats.stddev, 0.0);
    }

    #[test]
    fn test_empty_residuals() {
        assert!(ProjectionError::from_residuals(&[]).is_none());
    }

    #[test]
    fn test_nan_residual_poisons_statistics() {
        let stats = ProjectionError::from_residuals(&[0.0, f64::NAN, 1.0]).unwrap();

        assert_eq!(stats.non_finite, 1);
        assert!(!stats.is_finite());
        assert!(stats.min.is_nan());
        assert!(stats.max.is_nan());
        assert!(stats.mean.is_nan());
        assert!(stats.stddev.is_nan());
        assert!(stats.median.is_nan());
    }

    #[test]
    fn test_non_finite_statistics_survive_json() {
        let stats = ProjectionError::from_residuals(&[0.0, f64::NAN]).unwrap();
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"mean\":\"NaN\""));

        let parsed: ProjectionError = serde_json::from_str(&json).unwrap();
        assert!(parsed.min.is_nan() && parsed.mean.is_nan() && parsed.median.is_nan());
        assert_eq!(parsed.non_finite, 1);

        let stats = ProjectionError::from_residuals(&[0.0, f64::INFINITY]).unwrap();
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"max\":\"inf\""));

        let parsed: ProjectionError = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.min, 0.0);
        assert_eq!(parsed.max, f64::INFINITY);
        assert_eq!(parsed.mean, f64::INFINITY);
        assert!(parsed.stddev.is_nan());
    }

    #[test]
    fn test_unknown_text_value_is_rejected() {
        let json = r#"{"rmse":0.0,"min":"tiny","max":0.0,"mean":0.0,"stddev":0.0,"median":0.0,"count":1,"non_finite":0}"#;
        assert!(serde_json::from_str::<ProjectionError>(json).is_err());
    }

    #[test]
    fn test_infinite_residual_propagates() {
        let stats = ProjectionError::from_residuals(&[0.0, f64::INFINITY]).unwrap();

        assert_eq!(stats.non_finite, 1);
        assert_eq!(stats.min, 0.0);
        assert_eq!(stats.max, f64::INFINITY);
        assert_eq!(stats.mean, f64::INFINITY);
        assert!(!stats.stddev.is_finite());
    }
}
