use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{DataError, RepCoachError, Result};

/// Configuration for the train/test split
#[derive(Debug, Clone)]
pub struct SplitConfig {
    /// Test set fraction in [0.0, 1.0)
    pub test_fraction: f64,
    /// Random seed for reproducibility
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

/// Row indices assigned to each partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl SplitConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.test_fraction) {
            return Err(RepCoachError::Configuration(format!(
                "test_fraction must be in [0, 1), got {}",
                self.test_fraction
            )));
        }
        Ok(())
    }

    /// Number of test rows for a dataset of `total` rows (rounded up)
    pub fn test_size(&self, total: usize) -> usize {
        (total as f64 * self.test_fraction).ceil() as usize
    }

    /// Shuffle `0..total` with the seed, then take the test rows off the front
    pub fn split(&self, total: usize) -> Result<TrainTestSplit> {
        self.validate()?;

        let test_size = self.test_size(total);
        if total <= test_size {
            return Err(DataError::InsufficientRows {
                rows: total,
                required: test_size + 1,
            }
            .into());
        }

        let mut indices: Vec<usize> = (0..total).collect();
        let mut rng = StdRng::seed_from_u64(self.seed);
        indices.shuffle(&mut rng);

        let train = indices.split_off(test_size);
        Ok(TrainTestSplit {
            train,
            test: indices,
        })
    }
}
