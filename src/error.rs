use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum StoreError {
    #[error("Train not found: {0}")]
    NotFound(String),
}

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Unknown location code: {0}")]
    UnknownLocation(String),
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Persistent channel unavailable: {0}")]
    ChannelUnavailable(String),

    #[error("Snapshot poll failed: {0}")]
    Poll(String),

    #[error("Malformed server message: {0}")]
    Decode(String),

    #[error("Login rejected: {0}")]
    LoginRejected(String),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
