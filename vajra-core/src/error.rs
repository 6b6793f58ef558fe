use thiserror::Error;

pub type VajraResult<T> = Result<T, VajraError>;

#[derive(Error, Debug)]
pub enum VajraError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown notification channel: {0}")]
    UnknownChannel(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}
