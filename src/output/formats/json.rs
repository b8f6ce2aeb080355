//! JSON output formatter

use super::OutputFormatter;
use crate::output::error::OutputResult;
use crate::output::OutputFormat;
use crate::scan::types::Summary;

/// Writes the summaries as a two-space indented array
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, summaries: &[Summary]) -> OutputResult<String> {
        let mut rendered = serde_json::to_string_pretty(summaries)?;
        rendered.push('\n');
        Ok(rendered)
    }

    fn format_type(&self) -> OutputFormat {
        OutputFormat::Json
    }
}
