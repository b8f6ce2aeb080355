//! Output Error Types

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("output file is required and was not provided")]
    FileRequired,

    #[error("unsupported format: '{0}' (expected csv or json)")]
    UnsupportedFormat(String),

    #[error("failed to write output file {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize summaries: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl crate::core::error_handling::ContextualError for OutputError {
    fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            OutputError::FileRequired | OutputError::UnsupportedFormat(_)
        )
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            OutputError::FileRequired => Some("output file is required and was not provided"),
            OutputError::UnsupportedFormat(_) => Some("unsupported output format (expected csv or json)"),
            _ => None,
        }
    }
}

pub type OutputResult<T> = Result<T, OutputError>;
