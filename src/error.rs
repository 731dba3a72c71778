use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("transport error talking to {url}: {message}")]
    Transport { url: String, message: String },

    #[error("{method} {url} returned HTTP {status}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
    },

    #[error("failed to decode cluster response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("malformed cluster snapshot: {0}")]
    MalformedSnapshot(String),

    #[error("background request task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl Error {
    /// Whether the next poll may succeed where this one failed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport { .. } | Error::Join(_) => true,
            Error::Status { status, .. } => *status >= 500,
            Error::Decode(_) | Error::MalformedSnapshot(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
