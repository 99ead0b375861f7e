//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for lrstrader.
#[derive(Debug, thiserror::Error)]
pub enum LrsError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("invalid series {name}: {reason}")]
    InvalidSeries { name: String, reason: String },

    #[error("data alignment error ({from} to {to}): {reason}")]
    DataAlignment {
        reason: String,
        from: NaiveDate,
        to: NaiveDate,
    },

    #[error("insufficient history for {what}: have {have}, need {need}")]
    InsufficientHistory {
        what: String,
        have: usize,
        need: usize,
    },

    #[error("invalid state transition on {date}: {reason}")]
    InvalidStateTransition { date: NaiveDate, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LrsError {
    pub(crate) fn config_invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        LrsError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&LrsError> for std::process::ExitCode {
    fn from(err: &LrsError) -> Self {
        let code: u8 = match err {
            LrsError::Io(_) => 1,
            LrsError::ConfigParse { .. }
            | LrsError::ConfigMissing { .. }
            | LrsError::ConfigInvalid { .. } => 2,
            LrsError::Data { .. } | LrsError::InvalidSeries { .. } => 3,
            LrsError::DataAlignment { .. } => 4,
            LrsError::InsufficientHistory { .. } => 5,
            LrsError::InvalidStateTransition { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
