//! Metrics Error Types

/// Errors raised while setting up the metrics client
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// The StatsD address does not resolve
    #[error("invalid metrics address '{address}': {message}")]
    Address { address: String, message: String },

    /// The UDP socket could not be prepared
    #[error("failed to create metrics client: {message}")]
    Client { message: String },
}

impl crate::core::error_handling::ContextualError for MetricsError {
    fn is_user_actionable(&self) -> bool {
        matches!(self, MetricsError::Address { .. })
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            MetricsError::Address { message, .. } => Some(message),
            MetricsError::Client { .. } => None,
        }
    }
}
