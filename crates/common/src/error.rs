use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Exchange API error: {0}")]
    Exchange(String),

    /// The data provider asked us to back off (HTTP 429/418 or code -1003).
    #[error("Rate limited by data provider: {0}")]
    RateLimited(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid condition: {0}")]
    InvalidCondition(String),

    #[error("Notification delivery failed: {0}")]
    Notification(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Error::RateLimited(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
