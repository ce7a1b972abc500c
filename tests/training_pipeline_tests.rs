//! End-to-end tests for the offline training job

mod common;

use repcoach::artifact::ModelArtifact;
use repcoach::config::TrainingSettings;
use repcoach::error::{DataError, RepCoachError};
use repcoach::predictor::ExertionPredictor;
use repcoach::training::{TrainingPipeline, TrainingReport};
use repcoach::WellnessSample;
use std::fs;

#[test]
fn test_train_persists_loadable_artifact_and_report() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    common::write_dataset(data.path(), &["p01", "p02", "p03"], 40);
    let output = out.path().join("models").join("exertion_model.bin");

    let outcome = TrainingPipeline::new(TrainingSettings::default())
        .run(data.path(), &output)
        .unwrap();

    assert_eq!(outcome.report.dataset.participants, 3);
    assert_eq!(outcome.report.dataset.joined_rows, 120);
    assert_eq!(outcome.report.dataset.usable_rows, 120);
    assert_eq!(outcome.report.test_rows, 24);
    assert_eq!(outcome.report.train_rows, 96);
    assert!(outcome.report.test_mae.is_some());

    assert!(output.exists());
    assert!(TrainingReport::path_for(&output).exists());

    let loaded = ModelArtifact::load(&output).unwrap();
    assert_eq!(loaded.model, outcome.artifact.model);
    assert_eq!(
        loaded.feature_names,
        vec!["sleep_quality", "readiness", "stress_inv", "soreness_inv"]
    );
}

#[test]
fn test_report_write_failure_keeps_artifact() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    common::write_dataset(data.path(), &["p01", "p02"], 40);
    let output = out.path().join("model.bin");
    // A directory where the report file should go makes the write fail
    fs::create_dir_all(TrainingReport::path_for(&output)).unwrap();

    let outcome = TrainingPipeline::new(TrainingSettings::default())
        .run(data.path(), &output)
        .unwrap();

    assert!(output.exists());
    assert_eq!(ModelArtifact::load(&output).unwrap().model, outcome.artifact.model);
}

#[test]
fn test_same_seed_same_model() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    common::write_dataset(data.path(), &["p01", "p02"], 50);

    let pipeline = TrainingPipeline::new(TrainingSettings::default());
    let a = pipeline.run(data.path(), &out.path().join("a.bin")).unwrap();
    let b = pipeline.run(data.path(), &out.path().join("b.bin")).unwrap();
    assert_eq!(a.artifact.model, b.artifact.model);
    assert_eq!(a.report.test_mae, b.report.test_mae);
}

#[test]
fn test_trained_model_predicts_deterministically() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    common::write_dataset(data.path(), &["p01", "p02", "p03"], 40);
    let output = out.path().join("model.bin");
    TrainingPipeline::new(TrainingSettings::default())
        .run(data.path(), &output)
        .unwrap();

    let predictor = ExertionPredictor::load(&output).unwrap();
    let sample = WellnessSample::new(8.0, 7.0, 3.0, 2.0).unwrap();
    assert_eq!(sample.features().0, [8.0, 7.0, 7.0, 8.0]);

    let first = predictor.predict(&sample);
    let second = predictor.predict(&sample);
    assert_eq!(first, second);
    assert!(first.value().is_finite());
}

#[test]
fn test_disjoint_dates_yield_data_not_found_and_no_artifact() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let dir = data.path().join("p01").join("pmsys");
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("wellness.csv"),
        "effective_time_frame,readiness,sleep_quality,soreness,stress\n\
         2019-11-01T09:00:00.000Z,7,8,2,3\n",
    )
    .unwrap();
    fs::write(
        dir.join("srpe.csv"),
        "end_date_time,perceived_exertion\n\
         2020-03-01T18:00:00.000Z,6\n",
    )
    .unwrap();

    let output = out.path().join("model.bin");
    let err = TrainingPipeline::new(TrainingSettings::default())
        .run(data.path(), &output)
        .unwrap_err();

    assert!(matches!(
        err,
        RepCoachError::DataNotFound(DataError::EmptyJoin { .. })
    ));
    assert!(!output.exists());
}

#[test]
fn test_all_rows_dropped_yield_data_not_found_and_no_artifact() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let dir = data.path().join("p01").join("pmsys");
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("wellness.csv"),
        "effective_time_frame,readiness,sleep_quality,soreness,stress\n\
         2019-11-01T09:00:00.000Z,,8,2,3\n\
         2019-11-02T09:00:00.000Z,14,8,2,3\n",
    )
    .unwrap();
    fs::write(
        dir.join("srpe.csv"),
        "end_date_time,perceived_exertion\n\
         2019-11-01T18:00:00.000Z,6\n\
         2019-11-02T18:00:00.000Z,7\n",
    )
    .unwrap();

    let output = out.path().join("model.bin");
    let err = TrainingPipeline::new(TrainingSettings::default())
        .run(data.path(), &output)
        .unwrap_err();

    assert!(matches!(
        err,
        RepCoachError::DataNotFound(DataError::InsufficientRows { .. })
    ));
    assert!(!output.exists());
    assert!(!TrainingReport::path_for(&output).exists());
}

#[test]
fn test_missing_logs_yield_data_not_found() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    let err = TrainingPipeline::new(TrainingSettings::default())
        .run(data.path(), &out.path().join("model.bin"))
        .unwrap_err();

    assert!(matches!(
        err,
        RepCoachError::DataNotFound(DataError::NoFilesFound { .. })
    ));
    assert!(err.is_fatal());
}
