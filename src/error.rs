//! Error types.
//!
//! Two layers:
//!
//! - [`MatchError`] is returned by the matching core (`data`, `fit`, `report`).
//!   It names the failure class (configuration, missing series, domain gap).
//! - [`AppError`] is what the binary reports: a message plus a process exit code.
//!
//! Exit codes:
//! - `2`: bad input or configuration (missing files, malformed tables, unknown series)
//! - `3`: a reference does not cover a training x (domain error)
//! - `4`: terminal / internal failures

use thiserror::Error;

/// Failure classes of the matching core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchError {
    /// Empty or malformed input collections (no references, mismatched columns,
    /// duplicate x, a violated selection post-condition).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A series id that is not present in its table.
    #[error("series not found: `{name}`")]
    NotFound { name: String },

    /// A lookup at an x that is outside the series' domain.
    #[error("series `{series}` has no value at x={x}")]
    Domain { series: String, x: f64 },

    /// A (training, reference) pair that cannot be scored because the reference
    /// does not cover every training x.
    #[error("cannot compare `{train}` with `{reference}`: reference has no value at x={x}")]
    DomainPair {
        train: String,
        reference: String,
        x: f64,
    },
}

impl MatchError {
    pub fn configuration(message: impl Into<String>) -> Self {
        MatchError::Configuration(message.into())
    }

    /// Exit code used when this error aborts the `ideal` binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            MatchError::Configuration(_) | MatchError::NotFound { .. } => 2,
            MatchError::Domain { .. } | MatchError::DomainPair { .. } => 3,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<MatchError> for AppError {
    fn from(err: MatchError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
