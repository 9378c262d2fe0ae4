use thiserror::Error;

/// Reasons an event record cannot be turned into a calendar document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("malformed timestamp: {0:?}")]
    MalformedTimestamp(String),

    #[error("missing required field: {0}")]
    MissingRequiredField(&'static str),
}

/// Failures talking to the upstream event table.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("upstream request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("upstream responded with status {0}")]
    Status(reqwest::StatusCode),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable `{0}` is not set")]
    MissingVariable(&'static str),

    #[error("unknown time zone: {0:?}")]
    InvalidTimeZone(String),
}

/// Failures of a batch export run as a whole. Single records that cannot be
/// encoded are skipped, not reported here.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),
}
