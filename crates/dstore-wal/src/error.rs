use std::fmt;

#[derive(Debug)]
pub enum WalError {
    Io(std::io::Error),
    Serde(serde_json::Error),
    UnknownTransaction { id: String },
    UnknownCheckpoint { id: String },
    ChecksumMismatch { sequence: u64 },
}

impl fmt::Display for WalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalError::Io(e) => write!(f, "WAL I/O error: {e}"),
            WalError::Serde(e) => write!(f, "WAL serialization error: {e}"),
            WalError::UnknownTransaction { id } => write!(f, "no staged transaction '{id}'"),
            WalError::UnknownCheckpoint { id } => write!(f, "no checkpoint '{id}'"),
            WalError::ChecksumMismatch { sequence } => write!(f, "checksum mismatch at sequence {sequence}"),
        }
    }
}

impl std::error::Error for WalError {}

impl From<std::io::Error> for WalError {
    fn from(e: std::io::Error) -> Self {
        WalError::Io(e)
    }
}

impl From<serde_json::Error> for WalError {
    fn from(e: serde_json::Error) -> Self {
        WalError::Serde(e)
    }
}
