//! Offline training job
//!
//! load logs -> join -> drop incomplete -> seeded split -> fit -> persist.
//! Runs out of band; a serving process picks up the new artifact on restart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, instrument, warn};

use crate::artifact::ModelArtifact;
use crate::config::{ModelSettings, TrainingSettings};
use crate::error::{RepCoachError, Result};
use crate::gbdt::{mean_absolute_error, GradientBoostedRegressor};
use crate::training::dataset::{DatasetSummary, TrainingDataset};

/// Summary of a finished training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub trained_at: DateTime<Utc>,
    pub dataset_root: PathBuf,
    pub artifact_path: PathBuf,
    pub seed: u64,
    pub dataset: DatasetSummary,
    pub train_rows: usize,
    pub test_rows: usize,
    /// Held-out mean absolute error (None when the test split is empty)
    pub test_mae: Option<f64>,
    pub duration_ms: u64,
}

impl TrainingReport {
    /// Report location for a given artifact path: `<artifact>.report.json`
    pub fn path_for(artifact_path: &Path) -> PathBuf {
        let mut name = artifact_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "model".into());
        name.push(".report.json");
        artifact_path.with_file_name(name)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json =
            serde_json::to_string_pretty(self).map_err(|e| RepCoachError::Serialization(e.to_string()))?;
        fs::write(path, json)?;
        info!(path = %path.display(), "training report saved");
        Ok(())
    }
}

/// Artifact and report produced by [`TrainingPipeline::run`]
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub artifact: ModelArtifact,
    pub report: TrainingReport,
}

pub struct TrainingPipeline {
    settings: TrainingSettings,
}

impl TrainingPipeline {
    pub fn new(settings: TrainingSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &TrainingSettings {
        &self.settings
    }

    /// Train on every participant under `dataset_root` and persist to `output`
    ///
    /// Nothing is written unless fitting succeeds. The report is a
    /// diagnostic: failing to write it is logged and the run still succeeds
    /// with the artifact in place.
    #[instrument(skip(self), fields(seed = self.settings.seed))]
    pub fn run(&self, dataset_root: &Path, output: &Path) -> Result<TrainingOutcome> {
        let started = Instant::now();
        info!(root = %dataset_root.display(), "training pipeline started");

        let (dataset, summary) = TrainingDataset::load(dataset_root, self.settings.show_progress)?;
        let artifact = self.fit(&dataset)?;
        artifact.save(output)?;

        let report = TrainingReport {
            trained_at: artifact.trained_at,
            dataset_root: dataset_root.to_path_buf(),
            artifact_path: output.to_path_buf(),
            seed: artifact.seed,
            dataset: summary,
            train_rows: artifact.train_rows,
            test_rows: artifact.test_rows,
            test_mae: artifact.test_mae,
            duration_ms: started.elapsed().as_millis() as u64,
        };

        if self.settings.write_report {
            let report_path = TrainingReport::path_for(output);
            if let Err(e) = report.save_to_file(&report_path) {
                warn!(path = %report_path.display(), error = %e, "training report not written");
            }
        }

        info!(
            train_rows = report.train_rows,
            test_rows = report.test_rows,
            test_mae = ?report.test_mae,
            duration_ms = report.duration_ms,
            "training pipeline finished"
        );
        Ok(TrainingOutcome { artifact, report })
    }

    /// Split and fit an already assembled dataset
    pub fn fit(&self, dataset: &TrainingDataset) -> Result<ModelArtifact> {
        let split = self.settings.split_config().split(dataset.len())?;
        let (train_x, train_y) = dataset.matrix(&split.train);
        let (test_x, test_y) = dataset.matrix(&split.test);

        let model = GradientBoostedRegressor::fit(
            &train_x,
            &train_y,
            &self.settings.booster,
            self.settings.seed,
        )?;

        let test_mae = (!test_x.is_empty()).then(|| mean_absolute_error(&model, &test_x, &test_y));
        if let Some(mae) = test_mae {
            info!(mae, test_rows = test_x.len(), "held-out mean absolute error");
        }

        let mut artifact = ModelArtifact::new(model, self.settings.booster.clone(), self.settings.seed);
        artifact.train_rows = train_x.len();
        artifact.test_rows = test_x.len();
        artifact.test_mae = test_mae;
        Ok(artifact)
    }
}

/// Train with default settings and persist to the default artifact path
pub fn train(dataset_root: &Path) -> Result<ModelArtifact> {
    let output = ModelSettings::default().artifact_path;
    TrainingPipeline::new(TrainingSettings::default())
        .run(dataset_root, &output)
        .map(|outcome| outcome.artifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeatureVector;
    use crate::training::dataset::TrainingRecord;
    use chrono::NaiveDate;

    fn synthetic_dataset(n: usize) -> TrainingDataset {
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let records = (0..n)
            .map(|i| {
                let readiness = (i % 11) as f64;
                TrainingRecord {
                    participant_id: format!("p{:02}", i % 4),
                    date,
                    features: FeatureVector([3.0, readiness, 7.0, 8.0]),
                    target: 9.0 - 0.5 * readiness,
                }
            })
            .collect();
        TrainingDataset::new(records)
    }

    #[test]
    fn test_fit_records_split_sizes_and_mae() {
        let pipeline = TrainingPipeline::new(TrainingSettings::default());
        let artifact = pipeline.fit(&synthetic_dataset(100)).unwrap();

        assert_eq!(artifact.test_rows, 20);
        assert_eq!(artifact.train_rows, 80);
        assert_eq!(artifact.seed, 42);
        assert!(artifact.test_mae.unwrap() < 1.0);
    }

    #[test]
    fn test_fit_is_reproducible() {
        let pipeline = TrainingPipeline::new(TrainingSettings::default());
        let dataset = synthetic_dataset(60);
        let a = pipeline.fit(&dataset).unwrap();
        let b = pipeline.fit(&dataset).unwrap();
        assert_eq!(a.model, b.model);
    }

    #[test]
    fn test_report_path_sits_next_to_artifact() {
        let path = TrainingReport::path_for(Path::new("/models/exertion_model.bin"));
        assert_eq!(path, PathBuf::from("/models/exertion_model.bin.report.json"));
    }
}
