use thiserror::Error;

#[derive(Debug, Error)]
pub enum GoalClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid server address '{address}': {reason}")]
    Url { address: String, reason: String },

    #[error("goal service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("no goal is currently tracked")]
    NoGoalTracked,
}
