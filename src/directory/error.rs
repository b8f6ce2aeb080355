//! Directory Error Types

/// Errors raised while talking to the enterprise API
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// Missing or malformed client settings
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Identity verification against the API failed
    #[error("failed to authenticate with GitHub Enterprise: {message}")]
    Auth { message: String },

    /// Transport-level failure (connection refused, TLS, reset)
    #[error("Network error requesting {url}: {message}")]
    Network { url: String, message: String },

    /// The API answered with a non-success status
    #[error("HTTP {status} from {url}: {message}")]
    Http {
        url: String,
        status: u16,
        message: String,
    },

    /// The API answered with a body that is not the expected JSON
    #[error("Malformed response from {url}: {message}")]
    Decode { url: String, message: String },

    /// The run was cancelled while the request was pending
    #[error("request cancelled")]
    Cancelled,
}

impl DirectoryError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DirectoryError::Cancelled)
    }
}

impl crate::core::error_handling::ContextualError for DirectoryError {
    fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            DirectoryError::Config { .. } | DirectoryError::Auth { .. }
        )
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            DirectoryError::Config { message } | DirectoryError::Auth { message } => Some(message),
            _ => None,
        }
    }
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;
