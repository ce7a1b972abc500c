//! Load adjustment rules
//!
//! Deterministic tables that turn predicted or logged exertion into the next
//! prescribed weight and reps. Messages are shown to lifters verbatim, so the
//! wording is part of each rule.
//!
//! Two next-set policies exist side by side:
//! - [`next_set_by_zone`]: Rep-RPE zone directive (relative change)
//! - [`next_weight_by_rpe`]: RPE-banded absolute weight step
//!
//! They overlap and stay separate.

use chrono::Utc;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::models::{Baseline, PlannedExercise, SessionPlan};

/// Target rep band for a productive set (inclusive)
pub const TARGET_REP_MIN: u32 = 8;
pub const TARGET_REP_MAX: u32 = 12;

/// Target RPE band for a productive set (inclusive)
pub const TARGET_RPE_MIN: i32 = 7;
pub const TARGET_RPE_MAX: i32 = 9;

/// Floor for reps on a low-readiness day
pub const LOW_READINESS_MIN_REPS: u32 = 5;

/// Round a weight to exactly one decimal place, half to even
pub fn round_weight(weight: Decimal) -> Decimal {
    let mut rounded = weight.round_dp_with_strategy(1, RoundingStrategy::MidpointNearestEven);
    rounded.rescale(1);
    rounded
}

/// Adjust first-set reps from the model's predicted exertion
///
/// - predicted > 8: two fewer reps (never below zero)
/// - predicted < 6: one extra rep
/// - otherwise: unchanged
pub fn adjust_reps(predicted_exertion: f64, base_reps: u32) -> u32 {
    if predicted_exertion > 8.0 {
        base_reps.saturating_sub(2)
    } else if predicted_exertion < 6.0 {
        base_reps.saturating_add(1)
    } else {
        base_reps
    }
}

/// Session-level prescription for one exercise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaledLoad {
    pub weight: Decimal,
    pub reps: u32,
}

/// Scale baseline weight/reps by readiness
///
/// | readiness | weight | reps |
/// |-----------|--------|------|
/// | >= 8      | 100%   | base |
/// | 6 to <8   | 90%    | base |
/// | < 6       | 80%    | max(base - 2, 5) |
pub fn scale_session(readiness_score: f64, base_weight: Decimal, base_reps: u32) -> ScaledLoad {
    let (multiplier, reps) = if readiness_score >= 8.0 {
        (dec!(1.0), base_reps)
    } else if readiness_score >= 6.0 {
        (dec!(0.9), base_reps)
    } else {
        (
            dec!(0.8),
            base_reps.saturating_sub(2).max(LOW_READINESS_MIN_REPS),
        )
    };

    ScaledLoad {
        weight: round_weight(base_weight * multiplier),
        reps,
    }
}

/// Message attached to every exercise of a scaled session
pub fn readiness_message(readiness_score: f64) -> String {
    format!("Readiness score: {:.1}/10", readiness_score)
}

/// Build a full session plan from the user's baselines
pub fn plan_session(readiness_score: f64, baselines: &[Baseline]) -> SessionPlan {
    let message = readiness_message(readiness_score);

    let exercises = baselines
        .iter()
        .map(|baseline| {
            let load = scale_session(readiness_score, baseline.base_weight, baseline.base_reps);
            PlannedExercise {
                exercise_name: baseline.exercise_name.clone(),
                recommended_weight: load.weight,
                recommended_reps: load.reps,
                message: message.clone(),
            }
        })
        .collect();

    SessionPlan {
        id: Uuid::new_v4(),
        session_date: Utc::now().date_naive(),
        readiness_score,
        exercises,
    }
}

/// Action suggested by the Rep-RPE zone policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NextSetAction {
    DecreaseWeight,
    IncreaseWeight,
    FatigueDrop,
    MaintainWeight,
}

impl NextSetAction {
    pub fn message(&self) -> &'static str {
        match self {
            NextSetAction::DecreaseWeight => {
                "Too hard. Decrease the weight by 5-10% for the next set."
            }
            NextSetAction::IncreaseWeight => {
                "Too easy. Increase the weight by 2-5% for the next set."
            }
            NextSetAction::FatigueDrop => {
                "Fatigue detected. Drop the weight by 10-15% to stay in the rep zone."
            }
            NextSetAction::MaintainWeight => "Perfect. Keep the weight the same for the next set.",
        }
    }
}

impl fmt::Display for NextSetAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NextSetAction::DecreaseWeight => write!(f, "DECREASE_WEIGHT"),
            NextSetAction::IncreaseWeight => write!(f, "INCREASE_WEIGHT"),
            NextSetAction::FatigueDrop => write!(f, "FATIGUE_DROP"),
            NextSetAction::MaintainWeight => write!(f, "MAINTAIN_WEIGHT"),
        }
    }
}

/// Output of [`next_set_by_zone`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneDirective {
    pub action: NextSetAction,
    pub message: String,
}

/// Rep-RPE zone directive for the next set
///
/// Checked in order, first match wins: RPE above the zone, reps above the
/// zone, reps below the zone, otherwise maintain. A grinder with low reps is
/// therefore a weight decrease, not a fatigue drop.
pub fn next_set_by_zone(reps_done: u32, rpe_logged: i32) -> ZoneDirective {
    let action = if rpe_logged > TARGET_RPE_MAX {
        NextSetAction::DecreaseWeight
    } else if reps_done > TARGET_REP_MAX {
        NextSetAction::IncreaseWeight
    } else if reps_done < TARGET_REP_MIN {
        NextSetAction::FatigueDrop
    } else {
        NextSetAction::MaintainWeight
    };

    ZoneDirective {
        action,
        message: action.message().to_string(),
    }
}

/// Output of [`next_weight_by_rpe`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightStep {
    pub weight: Decimal,
    pub message: String,
}

/// Absolute weight step for the next set, banded by logged RPE
///
/// RPE outside 0..=10 keeps the weight and falls back to a neutral message.
pub fn next_weight_by_rpe(current_weight: Decimal, rpe_logged: i32) -> WeightStep {
    let (delta, message) = match rpe_logged {
        0..=3 => (dec!(5.0), "Way too easy! Adding +5 kg next set"),
        4..=5 => (dec!(2.5), "Felt light – bumping +2.5 kg"),
        6..=7 => (Decimal::ZERO, "Perfect intensity – same weight"),
        8..=9 => (dec!(-2.5), "Tough set – dropping 2.5 kg to keep quality high"),
        10 => (dec!(-5.0), "Grinder! Dropping 5 kg for better reps & form"),
        _ => (Decimal::ZERO, "Solid work – staying the same"),
    };

    WeightStep {
        weight: round_weight(current_weight + delta),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_adjust_reps_thresholds() {
        assert_eq!(adjust_reps(8.5, 10), 8);
        assert_eq!(adjust_reps(8.0, 10), 10);
        assert_eq!(adjust_reps(6.0, 10), 10);
        assert_eq!(adjust_reps(5.99, 10), 11);
        assert_eq!(adjust_reps(9.0, 1), 0);
    }

    #[test]
    fn test_adjust_reps_saturates_at_both_ends() {
        assert_eq!(adjust_reps(2.0, u32::MAX), u32::MAX);
        assert_eq!(adjust_reps(9.5, 0), 0);
    }

    #[test]
    fn test_scale_session_bands() {
        assert_eq!(
            scale_session(8.0, dec!(100), 10),
            ScaledLoad { weight: dec!(100.0), reps: 10 }
        );
        assert_eq!(
            scale_session(7.0, dec!(100), 10),
            ScaledLoad { weight: dec!(90.0), reps: 10 }
        );
        assert_eq!(
            scale_session(5.0, dec!(100), 10),
            ScaledLoad { weight: dec!(80.0), reps: 8 }
        );
    }

    #[test]
    fn test_scale_session_low_readiness_rep_floor() {
        assert_eq!(scale_session(3.0, dec!(60), 6).reps, 5);
        assert_eq!(scale_session(3.0, dec!(60), 3).reps, 5);
        assert_eq!(scale_session(5.99, dec!(60), 12).reps, 10);
    }

    #[test]
    fn test_scale_session_rounds_to_one_decimal() {
        let load = scale_session(7.0, dec!(62.75), 8);
        // 62.75 * 0.9 = 56.475
        assert_eq!(load.weight, dec!(56.5));
        assert_eq!(load.weight.scale(), 1);

        let load = scale_session(9.0, dec!(100), 10);
        assert_eq!(load.weight.to_string(), "100.0");
    }

    #[test]
    fn test_readiness_message_format() {
        assert_eq!(readiness_message(7.26), "Readiness score: 7.3/10");
        assert_eq!(readiness_message(8.0), "Readiness score: 8.0/10");
    }

    #[test]
    fn test_plan_session_covers_every_baseline() {
        let baselines = vec![
            Baseline::new("Squat", dec!(100), 10).unwrap(),
            Baseline::new("Bench Press", dec!(70), 8).unwrap(),
        ];

        let plan = plan_session(5.5, &baselines);
        assert_eq!(plan.exercises.len(), 2);
        assert_eq!(plan.exercises[0].exercise_name, "Squat");
        assert_eq!(plan.exercises[0].recommended_weight, dec!(80.0));
        assert_eq!(plan.exercises[0].recommended_reps, 8);
        assert_eq!(plan.exercises[1].recommended_weight, dec!(56.0));
        assert_eq!(plan.exercises[1].recommended_reps, 6);
        assert_eq!(plan.exercises[1].message, "Readiness score: 5.5/10");
    }

    #[test]
    fn test_zone_directive_ordering() {
        assert_eq!(next_set_by_zone(10, 10).action, NextSetAction::DecreaseWeight);
        assert_eq!(next_set_by_zone(5, 10).action, NextSetAction::DecreaseWeight);
        assert_eq!(next_set_by_zone(6, 8).action, NextSetAction::FatigueDrop);
        assert_eq!(next_set_by_zone(14, 8).action, NextSetAction::IncreaseWeight);
        assert_eq!(next_set_by_zone(10, 8).action, NextSetAction::MaintainWeight);
        assert_eq!(next_set_by_zone(12, 9).action, NextSetAction::MaintainWeight);
        assert_eq!(next_set_by_zone(8, 7).action, NextSetAction::MaintainWeight);
    }

    #[test]
    fn test_zone_directive_messages() {
        let directive = next_set_by_zone(14, 8);
        assert_eq!(
            directive.message,
            "Too easy. Increase the weight by 2-5% for the next set."
        );
        assert_eq!(directive.action.to_string(), "INCREASE_WEIGHT");

        let json = serde_json::to_string(&next_set_by_zone(6, 8)).unwrap();
        assert!(json.contains("\"FATIGUE_DROP\""));
    }

    #[test]
    fn test_rpe_step_bands() {
        assert_eq!(next_weight_by_rpe(dec!(100), 3).weight, dec!(105.0));
        assert_eq!(next_weight_by_rpe(dec!(100), 0).weight, dec!(105.0));
        assert_eq!(next_weight_by_rpe(dec!(100), 4).weight, dec!(102.5));
        assert_eq!(next_weight_by_rpe(dec!(100), 6).weight, dec!(100.0));
        assert_eq!(next_weight_by_rpe(dec!(100), 7).weight, dec!(100.0));
        assert_eq!(next_weight_by_rpe(dec!(100), 9).weight, dec!(97.5));
        assert_eq!(next_weight_by_rpe(dec!(100), 10).weight, dec!(95.0));
    }

    #[test]
    fn test_rpe_step_messages() {
        assert_eq!(
            next_weight_by_rpe(dec!(60), 10).message,
            "Grinder! Dropping 5 kg for better reps & form"
        );
        assert_eq!(
            next_weight_by_rpe(dec!(60), 5).message,
            "Felt light – bumping +2.5 kg"
        );
    }

    #[test]
    fn test_rpe_step_out_of_range_falls_back() {
        for rpe in [-1, 11, 42] {
            let step = next_weight_by_rpe(dec!(82.34), rpe);
            assert_eq!(step.weight, dec!(82.3));
            assert_eq!(step.message, "Solid work – staying the same");
        }
    }

    proptest! {
        #[test]
        fn test_adjust_reps_properties(base_reps in 2u32..60, exertion in 0.0f64..10.0) {
            let reps = adjust_reps(exertion, base_reps);
            if exertion > 8.0 {
                prop_assert_eq!(reps, base_reps - 2);
            } else if exertion < 6.0 {
                prop_assert_eq!(reps, base_reps + 1);
            } else {
                prop_assert_eq!(reps, base_reps);
            }
        }

        #[test]
        fn test_weight_outputs_have_one_decimal(
            cents in 1i64..100_000,
            readiness in 0.0f64..10.0,
            rpe in -3i32..14,
        ) {
            let weight = Decimal::new(cents, 2);
            prop_assert_eq!(scale_session(readiness, weight, 10).weight.scale(), 1);
            prop_assert_eq!(next_weight_by_rpe(weight, rpe).weight.scale(), 1);
        }
    }
}
