//! Repository error types.

use thiserror::Error;

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Failures a repository call can report.
///
/// The feed engine treats every variant as a generic failure; the
/// distinction only matters to callers of the repository itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// Connectivity or I/O failure.
    #[error("transport: {0}")]
    Transport(String),

    /// The post no longer exists remotely.
    #[error("post {0} not found")]
    NotFound(i64),
}

impl RepositoryError {
    /// Check if this is a transport failure.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<std::io::Error> for RepositoryError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_are_transport() {
        let err: RepositoryError =
            std::io::Error::new(std::io::ErrorKind::TimedOut, "read timed out").into();
        assert!(err.is_transport());
        assert_eq!(err.to_string(), "transport: read timed out");
    }

    #[test]
    fn not_found_message() {
        let err = RepositoryError::NotFound(5);
        assert!(!err.is_transport());
        assert_eq!(err.to_string(), "post 5 not found");
    }
}
