//! Call sequence used by the app layer
//!
//! check-in -> predict exertion -> session plan -> log each set -> next-set
//! recommendation. Persistence stays with the caller; this type only holds
//! the shared predictor.

use tracing::{debug, info};

use crate::adjustment::{
    adjust_reps, next_set_by_zone, next_weight_by_rpe, plan_session, WeightStep, ZoneDirective,
};
use crate::error::{InputError, Result};
use crate::history::SetLog;
use crate::models::{Baseline, ExertionPrediction, PerformedSet, SessionPlan, WellnessSample};
use crate::predictor::SharedPredictor;

#[derive(Debug, Clone)]
pub struct SessionOrchestrator {
    predictor: SharedPredictor,
}

impl SessionOrchestrator {
    pub fn new(predictor: SharedPredictor) -> Self {
        Self { predictor }
    }

    pub fn predict(&self, wellness: &WellnessSample) -> ExertionPrediction {
        self.predictor.predict(wellness)
    }

    /// Predict readiness from today's check-in and scale every baseline
    ///
    /// Fails with `InvalidInput` when the user has no baseline yet.
    pub fn start_session(&self, wellness: &WellnessSample, baselines: &[Baseline]) -> Result<SessionPlan> {
        if baselines.is_empty() {
            return Err(InputError::MissingBaseline.into());
        }
        for baseline in baselines {
            baseline.validate()?;
        }

        let readiness = self.predictor.predict(wellness);
        let plan = plan_session(readiness.value(), baselines);
        info!(
            session = %plan.id,
            readiness = %readiness,
            exercises = plan.exercises.len(),
            "session planned"
        );
        Ok(plan)
    }

    /// First-set reps from the predicted exertion
    pub fn first_set_reps(&self, wellness: &WellnessSample, base_reps: u32) -> u32 {
        let predicted = self.predictor.predict(wellness);
        adjust_reps(predicted.value(), base_reps)
    }

    /// Append a performed set and return the next-set weight
    ///
    /// The set's session must already be open in `log` (see
    /// [`SetLog::open_session`]). Uses the RPE-banded step; see
    /// [`Self::zone_guidance`] for the rep-zone policy.
    pub fn record_set(&self, log: &mut SetLog, set: PerformedSet) -> Result<WeightStep> {
        let logged = log.append(set)?;
        let step = next_weight_by_rpe(logged.performed_weight, i32::from(logged.performed_rpe));
        debug!(
            exercise = %logged.exercise_name,
            set_number = logged.set_number,
            rpe = logged.performed_rpe,
            next_weight = %step.weight,
            "set recorded"
        );
        Ok(step)
    }

    /// Rep-RPE zone directive for the latest set of an exercise
    pub fn zone_guidance(&self, log: &SetLog, exercise_name: &str) -> Option<ZoneDirective> {
        log.latest_for(exercise_name)
            .map(|set| next_set_by_zone(set.performed_reps, i32::from(set.performed_rpe)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjustment::NextSetAction;
    use crate::artifact::ModelArtifact;
    use crate::error::RepCoachError;
    use crate::gbdt::{BoosterParams, GradientBoostedRegressor};
    use crate::predictor::ExertionPredictor;
    use rust_decimal_macros::dec;

    /// Model that always predicts `value`
    fn constant_orchestrator(value: f64) -> SessionOrchestrator {
        let features = vec![vec![5.0, 5.0, 5.0, 5.0]; 4];
        let targets = vec![value; 4];
        let params = BoosterParams {
            n_estimators: 1,
            ..BoosterParams::default()
        };
        let model = GradientBoostedRegressor::fit(&features, &targets, &params, 42).unwrap();
        let predictor = ExertionPredictor::from_artifact(ModelArtifact::new(model, params, 42)).unwrap();
        SessionOrchestrator::new(predictor.into_shared())
    }

    fn wellness() -> WellnessSample {
        WellnessSample::new(8.0, 7.0, 3.0, 2.0).unwrap()
    }

    #[test]
    fn test_start_session_requires_baseline() {
        let orchestrator = constant_orchestrator(7.0);
        let err = orchestrator.start_session(&wellness(), &[]).unwrap_err();
        assert!(matches!(err, RepCoachError::InvalidInput(InputError::MissingBaseline)));
    }

    #[test]
    fn test_start_session_scales_by_prediction() {
        let orchestrator = constant_orchestrator(7.0);
        let baselines = vec![Baseline::new("Squat", dec!(100), 10).unwrap()];

        let plan = orchestrator.start_session(&wellness(), &baselines).unwrap();
        assert_eq!(plan.readiness_score, 7.0);
        assert_eq!(plan.exercises[0].recommended_weight, dec!(90.0));
        assert_eq!(plan.exercises[0].recommended_reps, 10);
        assert_eq!(plan.exercises[0].message, "Readiness score: 7.0/10");
    }

    #[test]
    fn test_first_set_reps_follow_threshold_table() {
        assert_eq!(constant_orchestrator(9.0).first_set_reps(&wellness(), 10), 8);
        assert_eq!(constant_orchestrator(7.0).first_set_reps(&wellness(), 10), 10);
        assert_eq!(constant_orchestrator(4.0).first_set_reps(&wellness(), 10), 11);
    }

    #[test]
    fn test_record_set_uses_rpe_step_and_keeps_log() {
        let orchestrator = constant_orchestrator(7.0);
        let baselines = vec![Baseline::new("Squat", dec!(100), 10).unwrap()];
        let plan = orchestrator.start_session(&wellness(), &baselines).unwrap();
        let mut log = SetLog::new();
        log.open_session(&plan);
        let set = PerformedSet {
            session_id: plan.id,
            exercise_name: "Squat".to_string(),
            set_number: 1,
            performed_reps: 6,
            performed_weight: dec!(100),
            performed_rpe: 10,
        };

        let step = orchestrator.record_set(&mut log, set).unwrap();
        assert_eq!(step.weight, dec!(95.0));
        assert_eq!(log.len(), 1);

        let zone = orchestrator.zone_guidance(&log, "Squat").unwrap();
        assert_eq!(zone.action, NextSetAction::DecreaseWeight);
        assert!(orchestrator.zone_guidance(&log, "Bench Press").is_none());
        assert_eq!(log.session_history()[0].sets_performed, 1);
    }

    #[test]
    fn test_record_set_rejects_invalid_set_without_logging() {
        let orchestrator = constant_orchestrator(7.0);
        let mut log = SetLog::new();
        let set = PerformedSet {
            session_id: uuid::Uuid::new_v4(),
            exercise_name: "Squat".to_string(),
            set_number: 0,
            performed_reps: 6,
            performed_weight: dec!(100),
            performed_rpe: 7,
        };
        assert!(orchestrator.record_set(&mut log, set).is_err());
        assert!(log.is_empty());
    }
}
