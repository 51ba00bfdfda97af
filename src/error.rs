// Error types for phab-stats.
// Covers configuration, Conduit transport and protocol errors, and comment parsing.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PhabStatsError {
    #[error("Missing PHABRICATOR_TOKEN environment variable")]
    MissingToken,

    #[error("Invalid Conduit token: {reason}")]
    InvalidToken { reason: String },

    #[error("Invalid base URL: {0:?}")]
    InvalidBaseUrl(String),

    #[error("Invalid PHID {value:?}: expected a {expected} identifier")]
    InvalidPhid { expected: &'static str, value: String },

    #[error("Conduit transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Conduit error {code}: {info}")]
    Remote { code: String, info: String },

    #[error("Comment {comment_id} is not a defect report: {reason}")]
    Parse { comment_id: u64, reason: String },

    #[error("Feed cursor did not advance past {cursor}")]
    CursorStalled { cursor: u64 },

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl PhabStatsError {
    /// Whether this error was raised while validating configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            PhabStatsError::MissingToken
                | PhabStatsError::InvalidToken { .. }
                | PhabStatsError::InvalidBaseUrl(_)
                | PhabStatsError::InvalidPhid { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PhabStatsError>;
