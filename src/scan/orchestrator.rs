//! Scan Orchestrator
//!
//! A fixed pool of workers pulls repository addresses from a shared FIFO
//! queue, runs the scanner for each one and forwards the resulting summaries
//! to the aggregator. A failed address always produces an error summary; a
//! clean report with no findings produces none.

use crate::core::shutdown::ShutdownSignal;
use crate::core::validation::{effective_concurrency, non_blank};
use crate::directory::types::RepositoryAddress;
use crate::scan::aggregator::{RepositoryBatch, ResultAggregator};
use crate::scan::error::{ScanError, ScanResult};
use crate::scan::invocation::Invocation;
use crate::scan::persist::RawResultStore;
use crate::scan::runner::{resolve_binary, ProcessOutput, ProcessRunner, ScannerRunner};
use crate::scan::types::{Finding, ScanConfig, Summary};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

/// Shared FIFO of addresses, closed once filled
#[derive(Clone)]
pub struct WorkQueue {
    rx: Arc<Mutex<mpsc::UnboundedReceiver<RepositoryAddress>>>,
}

impl WorkQueue {
    /// Queue every address up front; the queue drains to `None`
    pub fn filled(addresses: Vec<RepositoryAddress>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        for address in addresses {
            // The receiver is alive in this scope.
            let _ = tx.send(address);
        }
        Self {
            rx: Arc::new(Mutex::new(rx)),
        }
    }

    pub async fn next(&self) -> Option<RepositoryAddress> {
        self.rx.lock().await.recv().await
    }
}

struct ScanContext {
    config: ScanConfig,
    binary: String,
    runner: Arc<dyn ScannerRunner>,
    store: Option<RawResultStore>,
    shutdown: ShutdownSignal,
}

/// Runs the scan stage for one run
pub struct ScanOrchestrator {
    context: Arc<ScanContext>,
    concurrency: usize,
}

impl ScanOrchestrator {
    /// Validate the configuration and locate the scanner binary
    pub fn new(config: ScanConfig, shutdown: ShutdownSignal) -> ScanResult<Self> {
        validate(&config)?;
        let binary = resolve_binary(&config.binary_path)?;
        log::debug!("using Lava binary {}", binary.display());
        let binary = binary.to_string_lossy().into_owned();
        Ok(Self::build(config, binary, Arc::new(ProcessRunner), shutdown))
    }

    /// Validate the configuration and scan through a custom runner
    ///
    /// The binary path is passed to the runner untouched.
    pub fn with_runner(
        config: ScanConfig,
        runner: Arc<dyn ScannerRunner>,
        shutdown: ShutdownSignal,
    ) -> ScanResult<Self> {
        validate(&config)?;
        let binary = config.binary_path.clone();
        Ok(Self::build(config, binary, runner, shutdown))
    }

    fn build(
        config: ScanConfig,
        binary: String,
        runner: Arc<dyn ScannerRunner>,
        shutdown: ShutdownSignal,
    ) -> Self {
        let concurrency = effective_concurrency(config.concurrency);
        let store = config.results_path.clone().map(RawResultStore::new);
        Self {
            context: Arc::new(ScanContext {
                config,
                binary,
                runner,
                store,
                shutdown,
            }),
            concurrency,
        }
    }

    /// Effective number of workers
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Scan every address and return the flattened summaries
    pub async fn scan(&self, targets: Vec<RepositoryAddress>) -> Vec<Summary> {
        log::debug!(
            "start scanning {} repositories with {} workers",
            targets.len(),
            self.concurrency
        );
        if targets.is_empty() {
            return Vec::new();
        }

        let (tx, rx) = mpsc::channel::<RepositoryBatch>(targets.len());
        let pool_size = self.concurrency.min(targets.len());
        let queue = WorkQueue::filled(targets);
        let mut workers = JoinSet::new();

        for worker_id in 0..pool_size {
            let queue = queue.clone();
            let tx = tx.clone();
            let context = Arc::clone(&self.context);
            workers.spawn(async move {
                while let Some(address) = queue.next().await {
                    let summaries = scan_repository(&context, &address).await;
                    if tx.send(RepositoryBatch { address, summaries }).await.is_err() {
                        log::error!("scan worker {}: result channel closed", worker_id);
                        break;
                    }
                }
            });
        }
        drop(tx);

        let aggregator = ResultAggregator::new().collect(rx).await;

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                log::error!("scan worker failed: {}", e);
            }
        }

        log::debug!("scanning repositories completed");
        aggregator.finish()
    }
}

fn validate(config: &ScanConfig) -> ScanResult<()> {
    let missing = |message: &str| ScanError::Config {
        message: message.to_string(),
    };
    non_blank(Some(&config.token)).ok_or_else(|| missing("GitHub Enterprise token is required"))?;
    non_blank(Some(&config.endpoint))
        .ok_or_else(|| missing("GitHub Enterprise API base URL is required"))?;
    non_blank(Some(&config.check_image)).ok_or_else(|| missing("lava check image is required"))?;
    Ok(())
}

/// Scan one repository; failures become a single error summary
async fn scan_repository(context: &ScanContext, address: &str) -> Vec<Summary> {
    let started = Instant::now();
    log::debug!("repository scan started: {}", address);

    match run_and_parse(context, address).await {
        Ok(summaries) => {
            log::info!(
                "repository scan completed successfully: {} ({:.2}s)",
                address,
                started.elapsed().as_secs_f64()
            );
            summaries
        }
        Err(e) => {
            log::error!(
                "repository scan failed: {}: {} ({:.2}s)",
                address,
                e,
                started.elapsed().as_secs_f64()
            );
            vec![Summary::failed(address, e.to_string())]
        }
    }
}

async fn run_and_parse(context: &ScanContext, address: &str) -> ScanResult<Vec<Summary>> {
    if context.shutdown.is_cancelled() {
        return Err(ScanError::Cancelled);
    }

    let config = &context.config;
    let invocation = Invocation::new(
        context.binary.as_str(),
        config.endpoint.as_str(),
        config.token.as_str(),
        config.check_image.as_str(),
        address,
    );
    log::debug!("scan repository command: {}", invocation);

    let output = context.runner.run(&invocation, &context.shutdown).await?;
    persist(context, address, &output).await;

    if let Some(failure) = output.failure() {
        log::debug!(
            "Lava stderr for {}: {}",
            address,
            String::from_utf8_lossy(&output.stderr).trim()
        );
        return Err(failure);
    }

    parse_report(&output.stdout)
}

async fn persist(context: &ScanContext, address: &str, output: &ProcessOutput) {
    if let Some(store) = &context.store {
        if let Err(e) = store.store(address, &output.stdout, &output.stderr).await {
            log::error!("failed to store Lava scan results for {}: {}", address, e);
        }
    }
}

/// Decode a scanner report into one summary per finding
///
/// An empty findings array is a clean report and yields no summaries.
pub fn parse_report(stdout: &[u8]) -> ScanResult<Vec<Summary>> {
    let findings: Vec<Finding> =
        serde_json::from_slice(stdout).map_err(|e| ScanError::Output {
            message: e.to_string(),
        })?;
    Ok(findings.iter().map(Summary::from_finding).collect())
}
