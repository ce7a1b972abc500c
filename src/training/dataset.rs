//! Participant log discovery, parsing and joining
//!
//! Expected layout, one directory per participant:
//!
//! ```text
//! <root>/<participant>/<any>/wellness.csv   effective_time_frame, sleep_quality, readiness, stress, soreness, ...
//! <root>/<participant>/<any>/srpe.csv       end_date_time, perceived_exertion, ...
//! ```
//!
//! Extra columns are ignored. Empty or non-numeric cells count as missing.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{DataError, RepCoachError, Result};
use crate::models::{FeatureVector, WellnessSample};

pub const WELLNESS_FILE: &str = "wellness.csv";
pub const EXERTION_FILE: &str = "srpe.csv";

#[derive(Debug, Deserialize)]
struct WellnessRecord {
    #[serde(default)]
    effective_time_frame: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    sleep_quality: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    readiness: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    stress: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    soreness: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ExertionRecord {
    #[serde(default)]
    end_date_time: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    perceived_exertion: Option<f64>,
}

/// One wellness row tagged with its participant and calendar date
#[derive(Debug, Clone, PartialEq)]
pub struct WellnessLog {
    pub participant_id: String,
    pub date: Option<NaiveDate>,
    pub sleep_quality: Option<f64>,
    pub readiness: Option<f64>,
    pub stress: Option<f64>,
    pub soreness: Option<f64>,
}

/// One session-RPE row tagged with its participant and calendar date
#[derive(Debug, Clone, PartialEq)]
pub struct ExertionLog {
    pub participant_id: String,
    pub date: Option<NaiveDate>,
    pub perceived_exertion: Option<f64>,
}

/// A wellness row matched with a same-day exertion row
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRow {
    pub participant_id: String,
    pub date: NaiveDate,
    pub wellness: WellnessLog,
    pub perceived_exertion: Option<f64>,
}

/// Complete, validated training example
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingRecord {
    pub participant_id: String,
    pub date: NaiveDate,
    pub features: FeatureVector,
    pub target: f64,
}

/// Row counts collected while building a dataset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub wellness_files: usize,
    pub exertion_files: usize,
    pub participants: usize,
    pub wellness_rows: usize,
    pub exertion_rows: usize,
    pub joined_rows: usize,
    /// Joined rows missing a feature or the target
    pub incomplete_rows: usize,
    /// Joined rows whose wellness values fail validation
    pub invalid_rows: usize,
    pub usable_rows: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingDataset {
    records: Vec<TrainingRecord>,
}

impl TrainingDataset {
    pub fn new(records: Vec<TrainingRecord>) -> Self {
        Self { records }
    }

    /// Discover, parse and join every participant's logs under `root`
    pub fn load(root: &Path, show_progress: bool) -> Result<(Self, DatasetSummary)> {
        let wellness_files = discover(root, WELLNESS_FILE)?;
        let exertion_files = discover(root, EXERTION_FILE)?;
        info!(
            root = %root.display(),
            wellness_files = wellness_files.len(),
            exertion_files = exertion_files.len(),
            "discovered participant logs"
        );

        let progress = progress_bar(
            (wellness_files.len() + exertion_files.len()) as u64,
            show_progress,
        );
        let wellness = load_all(&wellness_files, &progress, read_wellness_file)?;
        let exertion = load_all(&exertion_files, &progress, read_exertion_file)?;
        progress.finish_and_clear();

        let joined = join_logs(&wellness, &exertion);
        if joined.is_empty() {
            return Err(DataError::EmptyJoin {
                wellness_rows: wellness.len(),
                exertion_rows: exertion.len(),
            }
            .into());
        }

        let (dataset, incomplete_rows, invalid_rows) = Self::from_joined(&joined);
        let participants: BTreeSet<&str> = dataset
            .records
            .iter()
            .map(|r| r.participant_id.as_str())
            .collect();

        let summary = DatasetSummary {
            wellness_files: wellness_files.len(),
            exertion_files: exertion_files.len(),
            participants: participants.len(),
            wellness_rows: wellness.len(),
            exertion_rows: exertion.len(),
            joined_rows: joined.len(),
            incomplete_rows,
            invalid_rows,
            usable_rows: dataset.len(),
        };
        info!(?summary, "training dataset assembled");

        if dataset.is_empty() {
            return Err(DataError::InsufficientRows { rows: 0, required: 1 }.into());
        }
        Ok((dataset, summary))
    }

    /// Keep joined rows with every feature and the target present
    ///
    /// Returns the dataset plus the counts of incomplete and invalid rows.
    pub fn from_joined(rows: &[JoinedRow]) -> (Self, usize, usize) {
        let mut records = Vec::with_capacity(rows.len());
        let mut incomplete = 0;
        let mut invalid = 0;

        for row in rows {
            let w = &row.wellness;
            let (Some(sleep_quality), Some(readiness), Some(stress), Some(soreness), Some(target)) = (
                w.sleep_quality,
                w.readiness,
                w.stress,
                w.soreness,
                row.perceived_exertion,
            ) else {
                incomplete += 1;
                continue;
            };

            if !target.is_finite() {
                incomplete += 1;
                continue;
            }

            match WellnessSample::new(sleep_quality, readiness, stress, soreness) {
                Ok(sample) => records.push(TrainingRecord {
                    participant_id: row.participant_id.clone(),
                    date: row.date,
                    features: sample.features(),
                    target,
                }),
                Err(e) => {
                    debug!(participant = %row.participant_id, date = %row.date, error = %e, "dropping invalid wellness row");
                    invalid += 1;
                }
            }
        }

        if invalid > 0 {
            warn!(invalid, "dropped joined rows with out-of-range wellness values");
        }

        (Self { records }, incomplete, invalid)
    }

    pub fn records(&self) -> &[TrainingRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Row-major feature matrix and target vector for the given row indices
    pub fn matrix(&self, rows: &[usize]) -> (Vec<Vec<f64>>, Vec<f64>) {
        rows.iter()
            .map(|&i| {
                let record = &self.records[i];
                (record.features.0.to_vec(), record.target)
            })
            .unzip()
    }
}

/// Find `<root>/*/*/<file_name>`, sorted
pub fn discover(root: &Path, file_name: &str) -> Result<Vec<PathBuf>> {
    let escaped_root = glob::Pattern::escape(&root.to_string_lossy());
    let pattern = format!("{}/*/*/{}", escaped_root.trim_end_matches('/'), file_name);

    let mut files: Vec<PathBuf> = glob::glob(&pattern)
        .map_err(|e| RepCoachError::Configuration(format!("invalid dataset root {}: {}", root.display(), e)))?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(error = %e, "skipping unreadable path during discovery");
                None
            }
        })
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(DataError::NoFilesFound { pattern }.into());
    }
    Ok(files)
}

/// Participant id is the directory two levels above the log file
pub fn participant_id(path: &Path) -> Option<String> {
    path.parent()?
        .parent()?
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

/// Calendar date of a log timestamp, as written (offsets are not applied)
pub fn parse_log_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }

    let formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%SZ",
        "%Y-%m-%dT%H:%M:%S%.fZ",
    ];
    for format in &formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.date());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

fn participant_for(path: &Path) -> Result<String> {
    participant_id(path).ok_or_else(|| {
        RepCoachError::Configuration(format!(
            "cannot derive participant id from {}",
            path.display()
        ))
    })
}

pub fn read_wellness_file(path: &Path) -> Result<Vec<WellnessLog>> {
    let participant = participant_for(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for record in reader.deserialize::<WellnessRecord>() {
        let record = record?;
        rows.push(WellnessLog {
            participant_id: participant.clone(),
            date: record.effective_time_frame.as_deref().and_then(parse_log_date),
            sleep_quality: record.sleep_quality,
            readiness: record.readiness,
            stress: record.stress,
            soreness: record.soreness,
        });
    }

    debug!(path = %path.display(), rows = rows.len(), "read wellness log");
    Ok(rows)
}

pub fn read_exertion_file(path: &Path) -> Result<Vec<ExertionLog>> {
    let participant = participant_for(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for record in reader.deserialize::<ExertionRecord>() {
        let record = record?;
        rows.push(ExertionLog {
            participant_id: participant.clone(),
            date: record.end_date_time.as_deref().and_then(parse_log_date),
            perceived_exertion: record.perceived_exertion,
        });
    }

    debug!(path = %path.display(), rows = rows.len(), "read exertion log");
    Ok(rows)
}

/// Parse files in parallel, concatenating rows in file order
fn load_all<T, F>(files: &[PathBuf], progress: &ProgressBar, read: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(&Path) -> Result<Vec<T>> + Sync,
{
    let per_file = files
        .par_iter()
        .map(|path| {
            let rows = read(path.as_path());
            progress.inc(1);
            rows
        })
        .collect::<Result<Vec<Vec<T>>>>()?;

    Ok(per_file.into_iter().flatten().collect())
}

/// Inner join on (participant_id, date)
///
/// Every matching pair is emitted, ordered by wellness row and then by
/// exertion row. Rows without a parseable date never match.
pub fn join_logs(wellness: &[WellnessLog], exertion: &[ExertionLog]) -> Vec<JoinedRow> {
    let mut by_key: HashMap<(&str, NaiveDate), Vec<&ExertionLog>> = HashMap::new();
    for log in exertion {
        if let Some(date) = log.date {
            by_key
                .entry((log.participant_id.as_str(), date))
                .or_default()
                .push(log);
        }
    }

    let mut joined = Vec::new();
    for w in wellness {
        let Some(date) = w.date else { continue };
        if let Some(matches) = by_key.get(&(w.participant_id.as_str(), date)) {
            for e in matches {
                joined.push(JoinedRow {
                    participant_id: w.participant_id.clone(),
                    date,
                    wellness: w.clone(),
                    perceived_exertion: e.perceived_exertion,
                });
            }
        }
    }
    joined
}

fn progress_bar(len: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} log files")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}
