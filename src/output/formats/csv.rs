//! CSV output formatter

use super::OutputFormatter;
use crate::output::error::OutputResult;
use crate::output::OutputFormat;
use crate::scan::types::Summary;

pub const HEADER: [&str; 5] = [
    "repository",
    "control_in_place",
    "number_of_controls",
    "controls",
    "error",
];

/// Separator used to join the controls of one summary into a single cell
pub const CONTROLS_SEPARATOR: &str = "#";

pub struct CsvFormatter {
    delimiter: char,
}

impl CsvFormatter {
    pub fn new() -> Self {
        Self { delimiter: ',' }
    }

    /// Quote a field when it holds the delimiter, a quote, a line break or leading blank
    fn escape_csv_value(&self, value: &str) -> String {
        let needs_quotes = value.contains(self.delimiter)
            || value.contains('"')
            || value.contains('\n')
            || value.contains('\r')
            || value.starts_with(' ')
            || value.starts_with('\t');
        if needs_quotes {
            format!("\"{}\"", value.replace('"', "\"\""))
        } else {
            value.to_string()
        }
    }

    fn write_record<'a>(&self, out: &mut String, fields: impl IntoIterator<Item = &'a str>) {
        let escaped: Vec<String> = fields
            .into_iter()
            .map(|field| self.escape_csv_value(field))
            .collect();
        out.push_str(&escaped.join(&self.delimiter.to_string()));
        out.push('\n');
    }
}

impl Default for CsvFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for CsvFormatter {
    fn format(&self, summaries: &[Summary]) -> OutputResult<String> {
        let mut result = String::new();
        self.write_record(&mut result, HEADER);

        for summary in summaries {
            let control_in_place = summary.control_in_place().to_string();
            let number_of_controls = summary.number_of_controls().to_string();
            let controls = summary.controls().join(CONTROLS_SEPARATOR);
            self.write_record(
                &mut result,
                [
                    summary.repository(),
                    control_in_place.as_str(),
                    number_of_controls.as_str(),
                    controls.as_str(),
                    summary.error(),
                ],
            );
        }

        Ok(result)
    }

    fn format_type(&self) -> OutputFormat {
        OutputFormat::Csv
    }
}
