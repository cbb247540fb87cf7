use reqwest::StatusCode;
use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("backend unreachable: {0}")]
    Network(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Server { status: StatusCode, body: String },

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Timeout,
    Server,
    Decode,
    Config,
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Network(e) if e.is_timeout() => ErrorKind::Timeout,
            ClientError::Network(e) if e.is_decode() => ErrorKind::Decode,
            ClientError::Network(_) => ErrorKind::Network,
            ClientError::Server { .. } => ErrorKind::Server,
            ClientError::Decode(_) => ErrorKind::Decode,
            ClientError::InvalidConfig(_) => ErrorKind::Config,
        }
    }

    /// One-line form for status bars.
    pub fn short(&self) -> String {
        match self {
            ClientError::Server { status, .. } => format!("server error {status}"),
            ClientError::Network(e) if e.is_timeout() => "request timed out".to_string(),
            ClientError::Network(_) => "backend unreachable".to_string(),
            ClientError::Decode(_) => "unexpected response".to_string(),
            ClientError::InvalidConfig(msg) => msg.clone(),
        }
    }
}
