//! Scan data types
//!
//! `Finding` mirrors the scanner's JSON report entries. `Summary` is the
//! per-repository record produced by the pipeline; its fields are private so
//! that `number_of_controls` always matches `controls`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Default number of concurrent scanner processes
pub const DEFAULT_LAVA_CONCURRENCY: i64 = 10;

/// Default scanner binary location
pub const DEFAULT_LAVA_BINARY_PATH: &str = "/usr/bin/lava";

/// Default compliance check image
pub const DEFAULT_LAVA_CHECK_IMAGE: &str = "vulcansec/vulcan-repository-sctrl:a20516f-4aae88d";

/// Row key whose value names a detected control
pub const CONTROL_KEY: &str = "Control";

/// Settings for the scan stage
#[derive(Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Enterprise endpoint handed to the check
    pub endpoint: String,
    pub token: String,
    /// Number of scanner processes; floored to 1
    pub concurrency: i64,
    pub binary_path: String,
    pub check_image: String,
    /// Base directory for raw scanner output
    pub results_path: Option<PathBuf>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            token: String::new(),
            concurrency: DEFAULT_LAVA_CONCURRENCY,
            binary_path: DEFAULT_LAVA_BINARY_PATH.to_string(),
            check_image: DEFAULT_LAVA_CHECK_IMAGE.to_string(),
            results_path: None,
        }
    }
}

impl std::fmt::Debug for ScanConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanConfig")
            .field("endpoint", &self.endpoint)
            .field("token", &"REDACTED")
            .field("concurrency", &self.concurrency)
            .field("binary_path", &self.binary_path)
            .field("check_image", &self.check_image)
            .field("results_path", &self.results_path)
            .finish()
    }
}

/// One entry of the scanner report
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Finding {
    #[serde(rename = "AffectedResource", alias = "affected_resource", default)]
    pub affected_resource: String,
    #[serde(rename = "Score", alias = "score", default)]
    pub score: f64,
    #[serde(rename = "Resources", alias = "resources", default)]
    pub resources: Vec<ResourceTable>,
}

impl Finding {
    /// Values under the `Control` key of every row, in encounter order
    pub fn controls(&self) -> Vec<String> {
        self.resources
            .iter()
            .flat_map(|table| table.rows.iter())
            .filter_map(|row| row.get(CONTROL_KEY).cloned())
            .collect()
    }
}

/// Tabular resource attached to a finding
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResourceTable {
    #[serde(rename = "Rows", alias = "rows", default)]
    pub rows: Vec<HashMap<String, String>>,
}

/// Compliance summary for one scanned repository
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", from = "SummaryRecord")]
pub struct Summary {
    repository: String,
    controls: Vec<String>,
    control_in_place: bool,
    number_of_controls: usize,
    error: String,
}

impl Summary {
    pub fn with_controls(
        repository: impl Into<String>,
        control_in_place: bool,
        controls: Vec<String>,
    ) -> Self {
        Self {
            repository: repository.into(),
            number_of_controls: controls.len(),
            controls,
            control_in_place,
            error: String::new(),
        }
    }

    /// Summary of one parsed finding
    pub fn from_finding(finding: &Finding) -> Self {
        Self::with_controls(
            finding.affected_resource.clone(),
            finding.score == 0.0,
            finding.controls(),
        )
    }

    /// Error summary for a repository that failed before parsing
    pub fn failed(repository: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            error: error.into(),
            ..Default::default()
        }
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn controls(&self) -> &[String] {
        &self.controls
    }

    pub fn control_in_place(&self) -> bool {
        self.control_in_place
    }

    pub fn number_of_controls(&self) -> usize {
        self.number_of_controls
    }

    pub fn error(&self) -> &str {
        &self.error
    }

    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }
}

// Wire shape accepted on input; the control count is recomputed.
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SummaryRecord {
    #[serde(default)]
    repository: String,
    #[serde(default)]
    controls: Option<Vec<String>>,
    #[serde(default)]
    control_in_place: bool,
    #[serde(default)]
    error: String,
}

impl From<SummaryRecord> for Summary {
    fn from(record: SummaryRecord) -> Self {
        let mut summary = Summary::with_controls(
            record.repository,
            record.control_in_place,
            record.controls.unwrap_or_default(),
        );
        summary.error = record.error;
        summary
    }
}
