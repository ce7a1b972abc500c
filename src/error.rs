//! Unified error hierarchy for RepCoach
//!
//! Every decision-engine failure surfaces through [`RepCoachError`] so the
//! calling layer can decide presentation. Nothing here is retried: all
//! engine operations are synchronous and either succeed or fail at once.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all RepCoach operations
#[derive(Debug, Error)]
pub enum RepCoachError {
    /// Malformed or missing wellness, baseline, or set fields
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] InputError),

    /// Model artifact missing or unusable
    #[error("Model unavailable: {0}")]
    ModelUnavailable(#[from] ModelError),

    /// Training data could not be found or produced no usable rows
    #[error("Training data not found: {0}")]
    DataNotFound(#[from] DataError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Artifact or payload (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Input validation errors
#[derive(Debug, Error)]
pub enum InputError {
    /// Required field absent from the payload
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// Field not part of the schema
    #[error("Unknown field: {field}")]
    UnknownField { field: String },

    /// NaN or infinite value
    #[error("Field {field} must be a finite number")]
    NotFinite { field: String },

    /// Value outside the accepted range
    #[error("Field {field}={value} outside [{min}, {max}]")]
    OutOfRange {
        field: String,
        value: String,
        min: String,
        max: String,
    },

    /// Payload could not be decoded at all
    #[error("Malformed payload: {reason}")]
    Malformed { reason: String },

    /// No baseline configured for the user
    #[error("No baseline data found. Please set your baseline first.")]
    MissingBaseline,

    /// Set logged against a session that was never opened
    #[error("Unknown session: {session_id}")]
    UnknownSession { session_id: String },
}

/// Model artifact errors
#[derive(Debug, Error)]
pub enum ModelError {
    /// Artifact file missing
    #[error("Model artifact not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// Artifact could not be decoded
    #[error("Corrupted model artifact: {reason}")]
    Corrupted { reason: String },

    /// Payload hash does not match the envelope
    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// Artifact written by an incompatible format version
    #[error("Unsupported artifact version: {version}")]
    UnsupportedVersion { version: u32 },

    /// Artifact was trained on a different feature layout
    #[error("Feature layout mismatch: expected {expected:?}, got {actual:?}")]
    FeatureMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },
}

/// Training data errors
#[derive(Debug, Error)]
pub enum DataError {
    /// Glob matched nothing
    #[error("No files matched {pattern}")]
    NoFilesFound { pattern: String },

    /// No (participant, date) key appears on both sides
    #[error("No matching participant/date rows ({wellness_rows} wellness, {exertion_rows} exertion)")]
    EmptyJoin {
        wellness_rows: usize,
        exertion_rows: usize,
    },

    /// Too few complete rows remain to fit
    #[error("Insufficient rows for training: {rows} usable, need at least {required}")]
    InsufficientRows { rows: usize, required: usize },
}

/// Result type alias for RepCoach operations
pub type Result<T> = std::result::Result<T, RepCoachError>;

impl RepCoachError {
    /// Fatal errors should stop the process (serving) or the run (training)
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RepCoachError::ModelUnavailable(_) | RepCoachError::DataNotFound(_)
        )
    }

    /// Errors caused by the caller's input (4xx-equivalent)
    pub fn is_client_error(&self) -> bool {
        matches!(self, RepCoachError::InvalidInput(_))
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            RepCoachError::InvalidInput(_) => ErrorSeverity::Warning,
            RepCoachError::ModelUnavailable(_) => ErrorSeverity::Critical,
            RepCoachError::DataNotFound(_) => ErrorSeverity::Critical,
            RepCoachError::Internal(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            RepCoachError::InvalidInput(InputError::MissingBaseline) => {
                InputError::MissingBaseline.to_string()
            }
            RepCoachError::InvalidInput(err) => {
                format!("Please check your check-in values: {}", err)
            }
            RepCoachError::ModelUnavailable(ModelError::NotFound { path }) => {
                format!(
                    "No trained model at {}. Run `repcoach train` first.",
                    path.display()
                )
            }
            RepCoachError::DataNotFound(DataError::NoFilesFound { pattern }) => {
                format!("Could not find training logs matching {}", pattern)
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical system error requiring immediate attention
    Critical,
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
    /// Informational message
    Info,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
            ErrorSeverity::Info => tracing::Level::INFO,
        }
    }
}
