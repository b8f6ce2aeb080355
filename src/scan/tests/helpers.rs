//! In-memory scanner runner used by the scan tests

use crate::core::shutdown::ShutdownSignal;
use crate::scan::error::{ScanError, ScanResult};
use crate::scan::invocation::Invocation;
use crate::scan::runner::{ProcessOutput, ScannerRunner};
use crate::scan::types::ScanConfig;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Scripted outcome for one target
#[derive(Clone)]
pub enum Outcome {
    Output(ProcessOutput),
    SpawnFailure(String),
    /// Wait until cancelled
    Hang,
}

#[derive(Default)]
pub struct FakeRunner {
    pub outcomes: HashMap<String, Outcome>,
    pub delay: Option<Duration>,
    pub seen: Mutex<Vec<String>>,
    pub active: AtomicUsize,
    pub peak: AtomicUsize,
}

impl FakeRunner {
    pub fn with(mut self, target: &str, outcome: Outcome) -> Self {
        self.outcomes.insert(target.to_string(), outcome);
        self
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScannerRunner for FakeRunner {
    async fn run(
        &self,
        invocation: &Invocation,
        shutdown: &ShutdownSignal,
    ) -> ScanResult<ProcessOutput> {
        self.seen.lock().unwrap().push(invocation.target().to_string());
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let outcome = self
            .outcomes
            .get(invocation.target())
            .cloned()
            .unwrap_or_else(|| Outcome::Output(ProcessOutput::success(report_for(invocation.target(), 0.0, &[]))));

        let result = match outcome {
            Outcome::Output(output) => Ok(output),
            Outcome::SpawnFailure(message) => Err(ScanError::Invocation { message }),
            Outcome::Hang => {
                shutdown.cancelled().await;
                Err(ScanError::Cancelled)
            }
        };
        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// JSON report with one finding
pub fn report_for(resource: &str, score: f64, controls: &[&str]) -> Vec<u8> {
    let rows: Vec<_> = controls
        .iter()
        .map(|c| serde_json::json!({ "Control": c }))
        .collect();
    serde_json::to_vec(&serde_json::json!([{
        "AffectedResource": resource,
        "Score": score,
        "Resources": [{ "Rows": rows }]
    }]))
    .unwrap()
}

pub fn config(concurrency: i64) -> ScanConfig {
    ScanConfig {
        endpoint: "https://ghe.example".to_string(),
        token: "ghp_test".to_string(),
        concurrency,
        binary_path: "lava".to_string(),
        ..Default::default()
    }
}
