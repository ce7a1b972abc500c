//! Exertion model training
//!
//! - [`dataset`]: participant log discovery, parsing and the (participant, date) join
//! - [`split`]: seeded train/test partitioning
//! - [`pipeline`]: the end-to-end job that fits and persists the model

pub mod dataset;
pub mod pipeline;
pub mod split;

pub use dataset::{DatasetSummary, TrainingDataset, TrainingRecord};
pub use pipeline::{train, TrainingOutcome, TrainingPipeline, TrainingReport};
pub use split::{SplitConfig, TrainTestSplit};
