//! Gradient-boosted regression trees
//!
//! Squared-error boosting: start from the target mean, then repeatedly fit a
//! shallow [`RegressionTree`] to the residuals and add it with shrinkage.
//! Fitting is fully deterministic for a given seed; the seed only matters
//! when row subsampling is enabled.

pub mod tree;

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use tracing::{debug, instrument};

use crate::error::{DataError, RepCoachError, Result};
pub use tree::{RegressionTree, TreeParams};

/// Fixed booster hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoosterParams {
    /// Number of boosting rounds
    pub n_estimators: usize,

    /// Shrinkage applied to every tree
    pub learning_rate: f64,

    /// Maximum tree depth
    pub max_depth: usize,

    /// Minimum rows per leaf
    pub min_samples_leaf: usize,

    /// Fraction of rows sampled per round (1.0 disables sampling)
    pub subsample: f64,
}

impl Default for BoosterParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 5,
            min_samples_leaf: 20,
            subsample: 1.0,
        }
    }
}

impl BoosterParams {
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(RepCoachError::Configuration(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(RepCoachError::Configuration(format!(
                "learning_rate must be in (0, 1], got {}",
                self.learning_rate
            )));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(RepCoachError::Configuration(format!(
                "subsample must be in (0, 1], got {}",
                self.subsample
            )));
        }
        Ok(())
    }

    fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            min_samples_leaf: self.min_samples_leaf,
            min_split_gain: 1e-12,
        }
    }
}

/// Fitted boosted ensemble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedRegressor {
    feature_count: usize,
    base_score: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
}

impl GradientBoostedRegressor {
    /// Fit on row-major `features` against `targets`
    #[instrument(skip_all, fields(rows = features.len(), rounds = params.n_estimators))]
    pub fn fit(features: &[Vec<f64>], targets: &[f64], params: &BoosterParams, seed: u64) -> Result<Self> {
        params.validate()?;

        if features.is_empty() {
            return Err(DataError::InsufficientRows { rows: 0, required: 1 }.into());
        }
        if features.len() != targets.len() {
            return Err(RepCoachError::Internal(format!(
                "{} feature rows but {} targets",
                features.len(),
                targets.len()
            )));
        }
        let feature_count = features[0].len();
        if features.iter().any(|row| row.len() != feature_count) {
            return Err(RepCoachError::Internal("ragged feature rows".to_string()));
        }

        let n = features.len();
        let base_score = targets.mean();
        let tree_params = params.tree_params();
        let sample_size = ((n as f64) * params.subsample).ceil().max(1.0) as usize;
        let mut rng = StdRng::seed_from_u64(seed);

        let mut predictions = vec![base_score; n];
        let mut residuals = vec![0.0; n];
        let mut trees = Vec::with_capacity(params.n_estimators);

        for round in 0..params.n_estimators {
            for i in 0..n {
                residuals[i] = targets[i] - predictions[i];
            }

            let rows: Vec<usize> = if sample_size < n {
                let mut picked = sample(&mut rng, n, sample_size).into_vec();
                picked.sort_unstable();
                picked
            } else {
                (0..n).collect()
            };

            let tree = RegressionTree::fit(features, &residuals, &rows, &tree_params);
            for (prediction, row) in predictions.iter_mut().zip(features) {
                *prediction += params.learning_rate * tree.predict(row);
            }

            if round % 25 == 0 {
                debug!(round, leaves = tree.leaf_count(), "fitted boosting round");
            }
            trees.push(tree);
        }

        Ok(Self {
            feature_count,
            base_score,
            learning_rate: params.learning_rate,
            trees,
        })
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        self.trees
            .iter()
            .fold(self.base_score, |acc, tree| acc + self.learning_rate * tree.predict(row))
    }

    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Reject structurally invalid ensembles (e.g. a tampered artifact)
    pub fn is_well_formed(&self) -> bool {
        self.base_score.is_finite()
            && self.learning_rate.is_finite()
            && self.trees.iter().all(|tree| tree.is_well_formed(self.feature_count))
    }
}

/// Mean absolute error of `model` on the given rows
pub fn mean_absolute_error(model: &GradientBoostedRegressor, features: &[Vec<f64>], targets: &[f64]) -> f64 {
    features
        .iter()
        .zip(targets)
        .map(|(row, target)| (model.predict(row) - target).abs())
        .collect::<Vec<f64>>()
        .mean()
}
