//! Yield prediction collaborator.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::ModelError;

/// Score given to every crop when no model is loaded.
pub const FALLBACK_YIELD: f64 = 1.0;

/// Location features fed to the yield model alongside the crop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YieldContext {
    /// Administrative region (e.g. a state name).
    #[serde(default)]
    pub region: String,
    /// Climate type (e.g. `tropical`, `temperate`).
    #[serde(default)]
    pub climate: String,
}

/// Predicts a yield score for one crop.
///
/// Implementations are loaded once at startup and shared across requests.
pub trait YieldPredictor: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Predicted yield for `crop` given the location and the shelter's
    /// volume goal. Higher is better; the unit is model-specific.
    fn predict(&self, context: &YieldContext, crop: &str, volume_goal: f64) -> f64;
}

/// A yield model that may or may not be present.
#[derive(Clone, Default)]
pub enum YieldModel {
    /// No model loaded; every crop scores [`FALLBACK_YIELD`].
    #[default]
    Unavailable,
    Available(Arc<dyn YieldPredictor>),
}

impl YieldModel {
    /// Model backed by `predictor`.
    pub fn available(predictor: impl YieldPredictor + 'static) -> Self {
        Self::Available(Arc::new(predictor))
    }

    /// Whether a predictor is loaded.
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    /// Predicted yield for `crop`, or [`FALLBACK_YIELD`] without a predictor.
    pub fn score(&self, context: &YieldContext, crop: &str, volume_goal: f64) -> f64 {
        match self {
            Self::Unavailable => FALLBACK_YIELD,
            Self::Available(model) => model.predict(context, crop, volume_goal),
        }
    }
}

impl fmt::Debug for YieldModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => f.write_str("YieldModel::Unavailable"),
            Self::Available(model) => write!(f, "YieldModel::Available({})", model.name()),
        }
    }
}

/// Linear regression exported as JSON coefficients.
///
/// ```json
/// {
///   "intercept": 2.0,
///   "volume_coefficient": 0.05,
///   "crop_offsets": { "Potatoes": 1.5, "Kale": -0.3 },
///   "region_offsets": { "Kerala": 0.4 },
///   "climate_offsets": { "tropical": 0.2 }
/// }
/// ```
///
/// Missing keys contribute zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearYieldModel {
    #[serde(default)]
    pub intercept: f64,
    #[serde(default)]
    pub volume_coefficient: f64,
    #[serde(default)]
    pub crop_offsets: HashMap<String, f64>,
    #[serde(default)]
    pub region_offsets: HashMap<String, f64>,
    #[serde(default)]
    pub climate_offsets: HashMap<String, f64>,
}

impl LinearYieldModel {
    /// Parse model coefficients from JSON.
    pub fn from_json(content: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Read and parse a coefficients file.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let content = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }
}

impl YieldPredictor for LinearYieldModel {
    fn name(&self) -> &str {
        "linear"
    }

    fn predict(&self, context: &YieldContext, crop: &str, volume_goal: f64) -> f64 {
        let offset = |table: &HashMap<String, f64>, key: &str| table.get(key).copied().unwrap_or(0.0);
        self.intercept
            + self.volume_coefficient * volume_goal
            + offset(&self.crop_offsets, crop)
            + offset(&self.region_offsets, &context.region)
            + offset(&self.climate_offsets, &context.climate)
    }
}
