//! Output formatters, one module per format

pub mod csv;
pub mod json;

use crate::output::error::OutputResult;
use crate::output::OutputFormat;
use crate::scan::types::Summary;

/// Renders a summary collection as file contents
pub trait OutputFormatter: Send + Sync {
    fn format(&self, summaries: &[Summary]) -> OutputResult<String>;

    fn format_type(&self) -> OutputFormat;
}

/// Formatter for the requested format
pub fn get_formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Csv => Box::new(csv::CsvFormatter::new()),
        OutputFormat::Json => Box::new(json::JsonFormatter::new()),
    }
}
