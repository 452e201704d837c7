//! Error types for Veilpost

use thiserror::Error;

/// Main error type for Veilpost operations
#[derive(Error, Debug)]
pub enum PostError {
    /// The decryption service sent an item or stage outside the protocol
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// Decryption failed (wrong key, tampered data, or malformed input)
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Comment operation requested before any content unit decrypted
    #[error("Post has not been decrypted")]
    NotDecrypted,

    /// Cryptographic operation failed
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Error during serialization/deserialization
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// General I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed profile identifier
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Invalid configuration value
    #[error("Config error: {0}")]
    Config(String),

    /// A unit decryption task panicked or was aborted
    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result type alias using PostError
pub type PostResult<T> = Result<T, PostError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PostError::ProtocolViolation("unknown stage".to_string());
        assert_eq!(format!("{}", err), "Protocol violation: unknown stage");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let post_err: PostError = io_err.into();
        assert!(matches!(post_err, PostError::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let post_err: PostError = json_err.into();
        assert!(matches!(post_err, PostError::Serialization(_)));
    }
}
