//! Metrics Sink
//!
//! Gauges and service checks emitted by the pipeline, delivered to a StatsD
//! agent when metrics are enabled.

pub mod error;
mod statsd;

pub use error::MetricsError;
pub use statsd::StatsdMetrics;

use crate::scan::types::Summary;
use std::collections::BTreeMap;
use std::sync::Arc;

/// StatsD agent used when no address is configured
pub const DEFAULT_METRICS_ADDRESS: &str = "localhost:8125";

/// Service check status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ServiceStatus {
    Ok = 0,
    Warning = 1,
    Critical = 2,
    Unknown = 3,
}

/// Destination for run metrics
pub trait MetricsSink: Send + Sync {
    fn gauge(&self, name: &str, value: i64, tags: &[String]);

    fn service_check(&self, status: ServiceStatus, message: &str);

    /// Deliver anything still buffered
    fn flush(&self) {}
}

/// Metrics configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSettings {
    pub enabled: bool,
    pub namespace: String,
    /// Tags appended to every metric (`key:value`)
    pub tags: Vec<String>,
    /// StatsD agent `host:port`
    pub address: String,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            namespace: "reposec".to_string(),
            tags: Vec::new(),
            address: DEFAULT_METRICS_ADDRESS.to_string(),
        }
    }
}

/// Discards every metric
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn gauge(&self, _name: &str, _value: i64, _tags: &[String]) {}

    fn service_check(&self, _status: ServiceStatus, _message: &str) {}
}

/// Build the sink selected by the settings
pub fn from_settings(settings: &MetricsSettings) -> Result<Arc<dyn MetricsSink>, MetricsError> {
    if settings.enabled {
        Ok(Arc::new(StatsdMetrics::connect(settings)?))
    } else {
        log::info!("metrics reporting disabled");
        Ok(Arc::new(NoopMetrics))
    }
}

/// Per-status and per-control tallies of a summary collection
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SummaryTally {
    pub with_controls: i64,
    pub without_controls: i64,
    pub errors: i64,
    pub controls: BTreeMap<String, i64>,
}

impl SummaryTally {
    pub fn from_summaries(summaries: &[Summary]) -> Self {
        let mut tally = Self::default();
        for summary in summaries {
            if summary.is_error() {
                tally.errors += 1;
                continue;
            }
            if summary.control_in_place() {
                tally.with_controls += 1;
            } else {
                tally.without_controls += 1;
            }
            for control in summary.controls() {
                *tally.controls.entry(control.clone()).or_insert(0) += 1;
            }
        }
        tally
    }
}

/// Emit the summary gauges for a finished scan
pub fn push_summary_metrics(metrics: &dyn MetricsSink, summaries: &[Summary]) {
    let tally = SummaryTally::from_summaries(summaries);
    for (target, value) in [
        ("with_controls", tally.with_controls),
        ("without_controls", tally.without_controls),
        ("error", tally.errors),
    ] {
        metrics.gauge("summary.status", value, &[format!("target:{}", target)]);
    }
    for (control, value) in &tally.controls {
        metrics.gauge("summary.controls", *value, &[format!("control:{}", control)]);
    }
}
