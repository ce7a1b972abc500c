use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{InputError, Result};
use crate::models::{PerformedSet, SessionPlan};

/// Append-only record of sessions and the sets performed in them for one user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetLog {
    sessions: Vec<SessionRecord>,
    sets: Vec<PerformedSet>,
}

/// A session known to the log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: Uuid,
    pub session_date: NaiveDate,
}

/// One row of the session history screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub session_date: NaiveDate,
    pub sets_performed: usize,
}

/// Aggregate per exercise, as shown on the stats screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseStats {
    pub exercise_name: String,
    pub total_sets: usize,
    pub average_rpe: f64,
    pub heaviest_weight: Decimal,
}

#[derive(Debug, Deserialize)]
struct SetRow {
    session_id: Uuid,
    session_date: NaiveDate,
    exercise_name: String,
    set_number: u32,
    performed_reps: u32,
    performed_weight: String,
    performed_rpe: u8,
}

impl SetLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replay a CSV export of performed sets, in file order
    ///
    /// Each distinct `session_id` is opened on first sight with its
    /// `session_date`.
    pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path.as_ref())?;

        let mut log = Self::new();
        for row in reader.deserialize::<SetRow>() {
            let row = row?;
            let weight = Decimal::from_str(&row.performed_weight).map_err(|e| InputError::Malformed {
                reason: format!("performed_weight '{}' for {}: {}", row.performed_weight, row.exercise_name, e),
            })?;
            log.open(row.session_id, row.session_date);
            log.append(PerformedSet {
                session_id: row.session_id,
                exercise_name: row.exercise_name,
                set_number: row.set_number,
                performed_reps: row.performed_reps,
                performed_weight: weight,
                performed_rpe: row.performed_rpe,
            })?;
        }
        Ok(log)
    }

    /// Register a planned session so sets can be logged against it
    pub fn open_session(&mut self, plan: &SessionPlan) {
        self.open(plan.id, plan.session_date);
    }

    fn open(&mut self, session_id: Uuid, session_date: NaiveDate) {
        if !self.sessions.iter().any(|s| s.session_id == session_id) {
            self.sessions.push(SessionRecord {
                session_id,
                session_date,
            });
        }
    }

    /// Validate and append; existing entries are never touched
    ///
    /// The set's session must have been opened first.
    pub fn append(&mut self, set: PerformedSet) -> Result<&PerformedSet> {
        set.validate()?;
        if !self.sessions.iter().any(|s| s.session_id == set.session_id) {
            return Err(InputError::UnknownSession {
                session_id: set.session_id.to_string(),
            }
            .into());
        }
        self.sets.push(set);
        Ok(&self.sets[self.sets.len() - 1])
    }

    pub fn sessions(&self) -> &[SessionRecord] {
        &self.sessions
    }

    pub fn sets(&self) -> &[PerformedSet] {
        &self.sets
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Most recently appended set for an exercise
    pub fn latest_for(&self, exercise_name: &str) -> Option<&PerformedSet> {
        self.sets
            .iter()
            .rev()
            .find(|set| set.exercise_name == exercise_name)
    }

    /// Next set number to log for an exercise (1-based)
    pub fn next_set_number(&self, exercise_name: &str) -> u32 {
        self.sets
            .iter()
            .filter(|set| set.exercise_name == exercise_name)
            .map(|set| set.set_number)
            .max()
            .map_or(1, |n| n + 1)
    }

    /// Every session with its set count, newest date first
    ///
    /// Sessions without sets are listed with a count of zero. Sessions on
    /// the same date keep the most recently opened first.
    pub fn session_history(&self) -> Vec<SessionSummary> {
        let mut counts: BTreeMap<Uuid, usize> = BTreeMap::new();
        for set in &self.sets {
            *counts.entry(set.session_id).or_default() += 1;
        }

        let mut history: Vec<SessionSummary> = self
            .sessions
            .iter()
            .rev()
            .map(|s| SessionSummary {
                session_id: s.session_id,
                session_date: s.session_date,
                sets_performed: counts.get(&s.session_id).copied().unwrap_or(0),
            })
            .collect();
        history.sort_by(|a, b| b.session_date.cmp(&a.session_date));
        history
    }

    /// Total sets and average RPE per exercise, ordered by exercise name
    pub fn exercise_stats(&self) -> Vec<ExerciseStats> {
        let mut grouped: BTreeMap<&str, Vec<&PerformedSet>> = BTreeMap::new();
        for set in &self.sets {
            grouped.entry(set.exercise_name.as_str()).or_default().push(set);
        }

        grouped
            .into_iter()
            .map(|(name, sets)| {
                let rpe_sum: u32 = sets.iter().map(|s| u32::from(s.performed_rpe)).sum();
                ExerciseStats {
                    exercise_name: name.to_string(),
                    total_sets: sets.len(),
                    average_rpe: f64::from(rpe_sum) / sets.len() as f64,
                    heaviest_weight: sets
                        .iter()
                        .map(|s| s.performed_weight)
                        .max()
                        .unwrap_or(Decimal::ZERO),
                }
            })
            .collect()
    }
}
