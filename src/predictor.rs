//! Exertion predictor service
//!
//! Holds one verified [`ModelArtifact`] for the life of the process. The
//! predictor is immutable after construction and is shared between callers
//! through [`SharedPredictor`].

use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, trace};

use crate::artifact::ModelArtifact;
use crate::error::Result;
use crate::models::{ExertionPrediction, FeatureVector, WellnessSample};

/// Handle passed to every caller that needs predictions
pub type SharedPredictor = Arc<ExertionPredictor>;

#[derive(Debug, Clone)]
pub struct ExertionPredictor {
    artifact: ModelArtifact,
}

impl ExertionPredictor {
    /// Load and verify the artifact at `path`
    ///
    /// Fails with `ModelUnavailable` when the file is missing or unusable;
    /// a serving process should not become ready in that case.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let artifact = ModelArtifact::load(path.as_ref())?;
        info!(
            path = %path.as_ref().display(),
            trees = artifact.model.n_trees(),
            trained_at = %artifact.trained_at,
            "exertion model loaded"
        );
        Ok(Self { artifact })
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self> {
        artifact.verify()?;
        Ok(Self { artifact })
    }

    pub fn into_shared(self) -> SharedPredictor {
        Arc::new(self)
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    /// Predict perceived exertion for a validated check-in
    pub fn predict(&self, sample: &WellnessSample) -> ExertionPrediction {
        self.predict_features(&sample.features())
    }

    pub fn predict_features(&self, features: &FeatureVector) -> ExertionPrediction {
        let value = self.artifact.model.predict(features.as_slice());
        trace!(?features, value, "exertion predicted");
        ExertionPrediction(value)
    }

    /// Predict from an untyped JSON check-in
    ///
    /// The payload must contain exactly `sleep_quality`, `readiness`,
    /// `stress` and `soreness`.
    pub fn predict_payload(&self, payload: &Value) -> Result<ExertionPrediction> {
        let sample = WellnessSample::from_json_value(payload)?;
        Ok(self.predict(&sample))
    }
}
