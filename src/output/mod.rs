//! Output Writer
//!
//! Serializes the final summary collection to the configured file as CSV or
//! JSON. The format and path are checked before the file is created.

pub mod error;
pub mod formats;

pub use error::{OutputError, OutputResult};
pub use formats::{get_formatter, OutputFormatter};

use crate::scan::types::Summary;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default output file
pub const DEFAULT_OUTPUT_FILE: &str = "/tmp/reposec.csv";

/// Supported output formats
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::AsRefStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl OutputFormat {
    /// Parse a user-supplied format name, ignoring case and surrounding blanks
    pub fn parse(value: &str) -> OutputResult<Self> {
        OutputFormat::from_str(value.trim())
            .map_err(|_| OutputError::UnsupportedFormat(value.to_string()))
    }
}

/// Require a non-empty output path
pub fn require_path(path: Option<&Path>) -> OutputResult<&Path> {
    path.filter(|p| !p.as_os_str().is_empty())
        .ok_or(OutputError::FileRequired)
}

/// Write the summaries to `path` in the named format
pub fn write_summaries(
    format: &str,
    path: Option<&Path>,
    summaries: &[Summary],
) -> OutputResult<PathBuf> {
    let path = require_path(path)?;
    let format = OutputFormat::parse(format)?;
    let contents = get_formatter(format).format(summaries)?;

    std::fs::write(path, contents).map_err(|source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!(
        "output written: {} ({} summaries, {})",
        path.display(),
        summaries.len(),
        format
    );
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parsing_is_case_insensitive() {
        assert_eq!(OutputFormat::parse("CSV").unwrap(), OutputFormat::Csv);
        assert_eq!(OutputFormat::parse(" Json ").unwrap(), OutputFormat::Json);
        assert!(matches!(
            OutputFormat::parse("xml"),
            Err(OutputError::UnsupportedFormat(ref f)) if f == "xml"
        ));
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }

    #[test]
    fn test_missing_path_fails_before_writing() {
        assert!(matches!(
            write_summaries("csv", None, &[]),
            Err(OutputError::FileRequired)
        ));
        assert!(matches!(
            write_summaries("csv", Some(Path::new("")), &[]),
            Err(OutputError::FileRequired)
        ));
    }

    #[test]
    fn test_unsupported_format_does_not_create_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xml");
        assert!(matches!(
            write_summaries("xml", Some(&path), &[]),
            Err(OutputError::UnsupportedFormat(_))
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_write_csv_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let summaries = vec![Summary::with_controls("org1/repo1", false, vec![])];

        let csv_path = dir.path().join("out.csv");
        write_summaries("csv", Some(&csv_path), &summaries).unwrap();
        let csv = std::fs::read_to_string(&csv_path).unwrap();
        assert_eq!(csv.lines().nth(1), Some("org1/repo1,false,0,,"));

        let json_path = dir.path().join("out.json");
        write_summaries("JSON", Some(&json_path), &summaries).unwrap();
        let back: Vec<Summary> =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(back, summaries);
    }

    #[test]
    fn test_unwritable_path_reports_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.csv");
        assert!(matches!(
            write_summaries("csv", Some(&path), &[]),
            Err(OutputError::Io { .. })
        ));
    }
}
