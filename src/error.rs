//! Error types for the Discord responder

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid Discord token: {0}")]
    InvalidCredential(String),

    #[error("API key rate limited: {0}")]
    RateLimited(String),

    #[error("No Gemini API keys configured")]
    NoCredentials,

    #[error("Message corpus unavailable: {0}")]
    CorpusUnavailable(String),

    #[error("HTTP error {status}: {message}")]
    HttpError { status: u16, message: String },

    #[error("Request failed: {0}")]
    TransportError(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::TransportError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}
