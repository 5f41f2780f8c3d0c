//! Error types for platform registry operations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("platform not found: {id} (known platforms: {})", known.join(", "))]
    NotFound { id: String, known: Vec<String> },

    #[error("unknown runner OS label: {0}")]
    UnknownRunnerOs(String),

    #[error("invalid platform registry: {0}")]
    InvalidRegistry(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for platform registry operations
pub type Result<T> = std::result::Result<T, PlatformError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_lists_known_platforms() {
        let err = PlatformError::NotFound {
            id: "freebsd".to_string(),
            known: vec!["ubuntu2204".to_string(), "macos".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("freebsd"));
        assert!(msg.contains("ubuntu2204, macos"));
    }

    #[test]
    fn test_unknown_runner_os_display() {
        let err = PlatformError::UnknownRunnerOs("solaris-11".to_string());
        assert_eq!(err.to_string(), "unknown runner OS label: solaris-11");
    }
}
