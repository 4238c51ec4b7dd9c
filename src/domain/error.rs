use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("Invalid book file: {0}")]
    InvalidBook(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Failure of a single queued transfer. Every variant is surfaced once as a
/// notification and never returned to the caller of `enqueue`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("HTTP {status}")]
    RequestFailed { status: u16 },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Stream read failed: {0}")]
    StreamRead(String),

    #[error("Failed to save file: {0}")]
    Save(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("Download target must not be empty")]
    EmptyTarget,

    #[error("Download file name must not be empty")]
    EmptyFileName,
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}

impl From<SaveError> for TransferError {
    fn from(err: SaveError) -> Self {
        TransferError::Save(err.to_string())
    }
}
