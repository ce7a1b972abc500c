use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{InputError, Result};

/// Lower bound of every self-reported wellness scale
pub const WELLNESS_MIN: f64 = 0.0;

/// Upper bound of every self-reported wellness scale
pub const WELLNESS_MAX: f64 = 10.0;

/// Highest RPE a user can log
pub const RPE_MAX: u8 = 10;

/// Model input columns, in the order the regressor sees them
pub const FEATURE_NAMES: [&str; 4] = ["sleep_quality", "readiness", "stress_inv", "soreness_inv"];

const WELLNESS_FIELDS: [&str; 4] = ["sleep_quality", "readiness", "stress", "soreness"];

/// Daily self-reported wellness check-in
///
/// Fields are private so a sample can only exist in a validated state.
/// Deserializing goes through the same validation as [`WellnessSample::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WellnessInput")]
pub struct WellnessSample {
    sleep_quality: f64,
    readiness: f64,
    stress: f64,
    soreness: f64,
}

/// Raw wire shape of a wellness check-in
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WellnessInput {
    pub sleep_quality: f64,
    pub readiness: f64,
    pub stress: f64,
    pub soreness: f64,
}

impl TryFrom<WellnessInput> for WellnessSample {
    type Error = InputError;

    fn try_from(input: WellnessInput) -> std::result::Result<Self, Self::Error> {
        WellnessSample::new(
            input.sleep_quality,
            input.readiness,
            input.stress,
            input.soreness,
        )
    }
}

impl WellnessSample {
    /// Build a sample, rejecting non-finite or out-of-range values
    pub fn new(
        sleep_quality: f64,
        readiness: f64,
        stress: f64,
        soreness: f64,
    ) -> std::result::Result<Self, InputError> {
        let values = [sleep_quality, readiness, stress, soreness];
        for (field, value) in WELLNESS_FIELDS.iter().zip(values) {
            Self::check_field(field, value)?;
        }

        Ok(Self {
            sleep_quality,
            readiness,
            stress,
            soreness,
        })
    }

    fn check_field(field: &str, value: f64) -> std::result::Result<(), InputError> {
        if !value.is_finite() {
            return Err(InputError::NotFinite {
                field: field.to_string(),
            });
        }
        if !(WELLNESS_MIN..=WELLNESS_MAX).contains(&value) {
            return Err(InputError::OutOfRange {
                field: field.to_string(),
                value: value.to_string(),
                min: WELLNESS_MIN.to_string(),
                max: WELLNESS_MAX.to_string(),
            });
        }
        Ok(())
    }

    /// Parse an untyped JSON object, as posted by a client
    ///
    /// All four fields are required and nothing else is accepted; numbers
    /// encoded as strings are not coerced.
    pub fn from_json_value(payload: &Value) -> std::result::Result<Self, InputError> {
        let object = payload.as_object().ok_or_else(|| InputError::Malformed {
            reason: "expected a JSON object".to_string(),
        })?;

        if let Some(unknown) = object
            .keys()
            .find(|key| !WELLNESS_FIELDS.contains(&key.as_str()))
        {
            return Err(InputError::UnknownField {
                field: unknown.clone(),
            });
        }

        let mut values = [0.0; 4];
        for (slot, field) in values.iter_mut().zip(WELLNESS_FIELDS) {
            let raw = object.get(field).ok_or_else(|| InputError::MissingField {
                field: field.to_string(),
            })?;
            *slot = raw.as_f64().ok_or_else(|| InputError::Malformed {
                reason: format!("{} must be a number, got {}", field, raw),
            })?;
        }

        Self::new(values[0], values[1], values[2], values[3])
    }

    pub fn sleep_quality(&self) -> f64 {
        self.sleep_quality
    }

    pub fn readiness(&self) -> f64 {
        self.readiness
    }

    pub fn stress(&self) -> f64 {
        self.stress
    }

    pub fn soreness(&self) -> f64 {
        self.soreness
    }

    /// Feature vector for the exertion model
    pub fn features(&self) -> FeatureVector {
        engineer_features(self.sleep_quality, self.readiness, self.stress, self.soreness)
    }
}

/// Ordered model input: `[sleep_quality, readiness, stress_inv, soreness_inv]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(pub [f64; 4]);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

/// Invert stress and soreness so that higher always means better recovery
///
/// Training and inference both go through this function; the model is only
/// valid for vectors produced here.
pub fn engineer_features(sleep_quality: f64, readiness: f64, stress: f64, soreness: f64) -> FeatureVector {
    FeatureVector([
        sleep_quality,
        readiness,
        WELLNESS_MAX - stress,
        WELLNESS_MAX - soreness,
    ])
}

/// Predicted perceived exertion (roughly 0-10, not clamped)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExertionPrediction(pub f64);

impl ExertionPrediction {
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for ExertionPrediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

/// Starting reference load for one exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub exercise_name: String,
    pub base_weight: Decimal,
    pub base_reps: u32,
}

#[derive(Debug, Deserialize)]
struct BaselineRow {
    exercise_name: String,
    base_weight: String,
    base_reps: u32,
}

impl Baseline {
    pub fn new(exercise_name: impl Into<String>, base_weight: Decimal, base_reps: u32) -> Result<Self> {
        let baseline = Self {
            exercise_name: exercise_name.into(),
            base_weight,
            base_reps,
        };
        baseline.validate()?;
        Ok(baseline)
    }

    pub fn validate(&self) -> Result<()> {
        if self.exercise_name.trim().is_empty() {
            return Err(InputError::MissingField {
                field: "exercise_name".to_string(),
            }
            .into());
        }
        if self.base_weight <= Decimal::ZERO {
            return Err(InputError::OutOfRange {
                field: "base_weight".to_string(),
                value: self.base_weight.to_string(),
                min: "0 (exclusive)".to_string(),
                max: "unbounded".to_string(),
            }
            .into());
        }
        if self.base_reps == 0 {
            return Err(InputError::OutOfRange {
                field: "base_reps".to_string(),
                value: "0".to_string(),
                min: "1".to_string(),
                max: "unbounded".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Read baselines from a CSV with `exercise_name,base_weight,base_reps`
    ///
    /// A later row for the same exercise replaces the earlier one.
    pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Baseline>> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path.as_ref())?;

        let mut baselines: Vec<Baseline> = Vec::new();
        for row in reader.deserialize::<BaselineRow>() {
            let row = row?;
            let weight = Decimal::from_str(&row.base_weight).map_err(|e| InputError::Malformed {
                reason: format!("base_weight '{}' for {}: {}", row.base_weight, row.exercise_name, e),
            })?;
            let baseline = Baseline::new(row.exercise_name, weight, row.base_reps)?;

            match baselines
                .iter_mut()
                .find(|b| b.exercise_name == baseline.exercise_name)
            {
                Some(existing) => *existing = baseline,
                None => baselines.push(baseline),
            }
        }

        Ok(baselines)
    }
}

/// One logged set; never mutated once appended to a [`SetLog`](crate::history::SetLog)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformedSet {
    /// [`SessionPlan::id`] of the session the set belongs to
    pub session_id: Uuid,
    pub exercise_name: String,
    pub set_number: u32,
    pub performed_reps: u32,
    pub performed_weight: Decimal,
    pub performed_rpe: u8,
}

impl PerformedSet {
    pub fn validate(&self) -> Result<()> {
        if self.exercise_name.trim().is_empty() {
            return Err(InputError::MissingField {
                field: "exercise_name".to_string(),
            }
            .into());
        }
        if self.set_number == 0 {
            return Err(InputError::OutOfRange {
                field: "set_number".to_string(),
                value: "0".to_string(),
                min: "1".to_string(),
                max: "unbounded".to_string(),
            }
            .into());
        }
        if self.performed_weight < Decimal::ZERO {
            return Err(InputError::OutOfRange {
                field: "performed_weight".to_string(),
                value: self.performed_weight.to_string(),
                min: "0".to_string(),
                max: "unbounded".to_string(),
            }
            .into());
        }
        if self.performed_rpe > RPE_MAX {
            return Err(InputError::OutOfRange {
                field: "performed_rpe".to_string(),
                value: self.performed_rpe.to_string(),
                min: "0".to_string(),
                max: RPE_MAX.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Prescription for one exercise in a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedExercise {
    pub exercise_name: String,
    pub recommended_weight: Decimal,
    pub recommended_reps: u32,
    pub message: String,
}

/// Readiness-scaled plan for a whole workout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPlan {
    pub id: Uuid,
    pub session_date: NaiveDate,
    pub readiness_score: f64,
    pub exercises: Vec<PlannedExercise>,
}
