//! Scan Error Types

/// Errors raised while configuring or running the scanner
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    /// Missing or invalid scanner settings
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The scanner binary is neither a file nor on the search path
    #[error("failed to find Lava binary '{path}'")]
    BinaryNotFound { path: String },

    /// The scanner could not be started, or did not exit cleanly
    #[error("error running Lava: {message}")]
    Invocation { message: String },

    /// The scanner exited cleanly but its report could not be decoded
    #[error("error unmarshalling Lava report: {message}")]
    Output { message: String },

    /// The run was cancelled before the scan finished
    #[error("error running Lava: scan cancelled")]
    Cancelled,
}

impl crate::core::error_handling::ContextualError for ScanError {
    fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            ScanError::Config { .. } | ScanError::BinaryNotFound { .. }
        )
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            ScanError::Config { message } => Some(message),
            _ => None,
        }
    }
}

pub type ScanResult<T> = Result<T, ScanError>;

/// Failure to persist raw scanner output
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// The address does not name an organization and repository
    #[error("cannot derive results location from '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("failed to write {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error_handling::ContextualError;

    #[test]
    fn test_summary_error_messages() {
        assert_eq!(
            ScanError::Invocation {
                message: "exit status 1".to_string()
            }
            .to_string(),
            "error running Lava: exit status 1"
        );
        assert_eq!(
            ScanError::Output {
                message: "EOF while parsing".to_string()
            }
            .to_string(),
            "error unmarshalling Lava report: EOF while parsing"
        );
        assert_eq!(
            ScanError::Cancelled.to_string(),
            "error running Lava: scan cancelled"
        );
    }

    #[test]
    fn test_config_errors_are_user_actionable() {
        let err = ScanError::Config {
            message: "lava check image is required".to_string(),
        };
        assert!(err.is_user_actionable());
        assert_eq!(err.user_message(), Some("lava check image is required"));
        assert!(ScanError::BinaryNotFound {
            path: "/nope".to_string()
        }
        .is_user_actionable());
        assert!(!ScanError::Cancelled.is_user_actionable());
    }
}
