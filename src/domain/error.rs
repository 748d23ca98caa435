//! Domain error types.

/// Top-level error type for sweepscan.
#[derive(Debug, thiserror::Error)]
pub enum SweepscanError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

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

    #[error("invalid bar series for {instrument} ({timeframe}): {reason}")]
    InvalidSeries {
        instrument: String,
        timeframe: String,
        reason: String,
    },

    #[error("no data for {instrument} ({timeframe})")]
    NoData {
        instrument: String,
        timeframe: String,
    },

    #[error("unknown instrument: {0}")]
    UnknownInstrument(String),

    #[error("collaborator failure ({collaborator}): {reason}")]
    Collaborator {
        collaborator: String,
        reason: String,
    },

    #[error("evaluation cycle failed: {reason}")]
    CycleFailed { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SweepscanError {
    pub fn collaborator(collaborator: &str, reason: impl Into<String>) -> Self {
        SweepscanError::Collaborator {
            collaborator: collaborator.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&SweepscanError> for std::process::ExitCode {
    fn from(err: &SweepscanError) -> Self {
        let code: u8 = match err {
            SweepscanError::Io(_) => 1,
            SweepscanError::ConfigParse { .. }
            | SweepscanError::ConfigMissing { .. }
            | SweepscanError::ConfigInvalid { .. } => 2,
            SweepscanError::Database { .. } | SweepscanError::DatabaseQuery { .. } => 3,
            SweepscanError::Collaborator { .. } => 4,
            SweepscanError::InvalidSeries { .. }
            | SweepscanError::NoData { .. }
            | SweepscanError::UnknownInstrument(_) => 5,
            SweepscanError::CycleFailed { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
