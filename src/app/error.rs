//! Run-fatal errors

use crate::app::cli::config::ConfigError;
use crate::core::error_handling::ContextualError;
use crate::directory::error::DirectoryError;
use crate::metrics::MetricsError;
use crate::output::error::OutputError;
use crate::scan::error::ScanError;

/// Exit status for a failed run
pub const EXIT_FAILURE: i32 = 1;
/// Exit status for a cancelled run
pub const EXIT_CANCELLED: i32 = 130;

/// Anything that ends a run early
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to initialize logging: {0}")]
    Logging(String),

    #[error(transparent)]
    Metrics(#[from] MetricsError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Output(#[from] OutputError),
}

impl RunError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunError::Directory(DirectoryError::Cancelled))
            || matches!(self, RunError::Scan(ScanError::Cancelled))
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_cancelled() {
            EXIT_CANCELLED
        } else {
            EXIT_FAILURE
        }
    }
}

impl ContextualError for RunError {
    fn is_user_actionable(&self) -> bool {
        match self {
            RunError::Config(e) => e.is_user_actionable(),
            RunError::Logging(_) => true,
            RunError::Metrics(e) => e.is_user_actionable(),
            RunError::Directory(e) => e.is_user_actionable(),
            RunError::Scan(e) => e.is_user_actionable(),
            RunError::Output(e) => e.is_user_actionable(),
        }
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            RunError::Config(e) => e.user_message(),
            RunError::Logging(message) => Some(message),
            RunError::Metrics(e) => e.user_message(),
            RunError::Directory(e) => e.user_message(),
            RunError::Scan(e) => e.user_message(),
            RunError::Output(e) => e.user_message(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(RunError::from(DirectoryError::Cancelled).exit_code(), 130);
        assert_eq!(RunError::from(ScanError::Cancelled).exit_code(), 130);
        assert_eq!(RunError::from(OutputError::FileRequired).exit_code(), 1);
        assert_eq!(
            RunError::from(MetricsError::Client {
                message: "bind failed".to_string()
            })
            .exit_code(),
            1
        );
        assert_eq!(
            RunError::from(DirectoryError::Auth {
                message: "Bad credentials".to_string()
            })
            .exit_code(),
            1
        );
    }

    #[test]
    fn test_wrapped_errors_keep_their_messages() {
        let err = RunError::from(OutputError::UnsupportedFormat("xml".to_string()));
        assert!(err.is_user_actionable());
        assert_eq!(err.to_string(), "unsupported format: 'xml' (expected csv or json)");
    }
}
