use thiserror::Error;
use vantage::VantageError;

/// CLI-level errors mapped to exit codes.
#[derive(Debug, Error)]
pub(crate) enum CliError {
    #[error(transparent)]
    Vantage(#[from] VantageError),

    #[error("invalid job: {0}")]
    Job(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl CliError {
    pub(crate) const fn exit_code(&self) -> u8 {
        match self {
            Self::Vantage(VantageError::Configuration(_) | VantageError::InvalidRequest(_))
            | Self::Job(_) => 2,
            Self::Vantage(VantageError::Cancelled) => 130,
            Self::Vantage(_) => 1,
            Self::Serialization(_) => 4,
        }
    }
}
