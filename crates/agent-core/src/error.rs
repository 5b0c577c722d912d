use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Session store unreadable: {}: {source}", path.display())]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MonitorError {
    /// Whether this error names a missing session rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, MonitorError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_distinguished() {
        let missing = MonitorError::NotFound("abc".into());
        assert!(missing.is_not_found());
        assert_eq!(missing.to_string(), "Session not found: abc");

        let store = MonitorError::Store {
            path: PathBuf::from("/var/sessions"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(!store.is_not_found());
        assert!(store.to_string().starts_with("Session store unreadable: /var/sessions: "));
    }
}
