// Library interface for RepCoach modules
// This allows integration tests and benches to access the core functionality

pub mod adjustment;
pub mod artifact;
pub mod config;
pub mod error;
pub mod gbdt;
pub mod history;
pub mod logging;
pub mod models;
pub mod predictor;
pub mod session;
pub mod training;

// Re-export commonly used types for convenience
pub use models::*;
pub use adjustment::{
    adjust_reps, next_set_by_zone, next_weight_by_rpe, plan_session, scale_session, NextSetAction,
    ScaledLoad, WeightStep, ZoneDirective,
};
pub use artifact::ModelArtifact;
pub use config::AppConfig;
pub use error::{DataError, InputError, ModelError, RepCoachError, Result};
pub use gbdt::{BoosterParams, GradientBoostedRegressor};
pub use history::{ExerciseStats, SessionRecord, SessionSummary, SetLog};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use predictor::{ExertionPredictor, SharedPredictor};
pub use session::SessionOrchestrator;
pub use training::{train, SplitConfig, TrainingPipeline};
