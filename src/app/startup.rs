//! Application startup and the end-to-end run

use crate::app::cli::{load_config_file, Args, Config};
use crate::app::error::{RunError, EXIT_CANCELLED};
use crate::core::error_handling::log_error_with_context;
use crate::core::logging::init_logging;
use crate::core::shutdown::{ShutdownCoordinator, ShutdownSignal};
use crate::directory::client::{GheClient, RepositoryDirectory};
use crate::directory::error::DirectoryError;
use crate::discovery::DiscoveryOrchestrator;
use crate::metrics::{self, push_summary_metrics, MetricsSink, ServiceStatus};
use crate::output::write_summaries;
use crate::scan::ScanOrchestrator;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// What a completed pipeline produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub repositories: usize,
    pub summaries: usize,
    pub output: PathBuf,
    pub cancelled: bool,
}

/// Parse configuration, start logging and run; returns the process exit status
pub async fn startup() -> i32 {
    let args = Args::from_env();
    let config_file = args.config_file.clone();

    let config = match load_config_file(config_file.as_deref())
        .await
        .and_then(|file| Config::resolve(args, file.as_ref()))
    {
        Ok(config) => config,
        Err(e) => {
            let err = RunError::from(e);
            eprintln!("failed to load configuration: {}", err);
            return err.exit_code();
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        let err = RunError::Logging(e.to_string());
        eprintln!("{}", err);
        return err.exit_code();
    }

    log::info!(
        "starting GitHub Enterprise reposec {}",
        crate::core::version::long_version()
    );
    log::info!("configuration: {:?}", config.redacted());

    ShutdownCoordinator::guard_with_coordinator(|coordinator| async move {
        run(config, coordinator.signal()).await
    })
    .await
}

/// Connect, discover, scan and write the output
pub async fn run(config: Config, shutdown: ShutdownSignal) -> i32 {
    let started = Instant::now();
    let metrics = match metrics::from_settings(&config.metrics) {
        Ok(metrics) => metrics,
        Err(e) => {
            let err = RunError::from(e);
            log_error_with_context(&err, "failed to create metrics client");
            return err.exit_code();
        }
    };

    let result = connect_and_run(&config, Arc::clone(&metrics), &shutdown).await;
    finish(result, metrics.as_ref(), started)
}

async fn connect_and_run(
    config: &Config,
    metrics: Arc<dyn MetricsSink>,
    shutdown: &ShutdownSignal,
) -> Result<RunOutcome, RunError> {
    let client = GheClient::connect(&config.directory, shutdown.clone()).await?;
    log::info!("authenticated to GitHub Enterprise as {}", client.login());
    let scanner = ScanOrchestrator::new(config.scan.clone(), shutdown.clone())?;
    run_pipeline(config, Arc::new(client), scanner, metrics, shutdown).await
}

/// Discovery, scanning and output against already-built stages
pub async fn run_pipeline(
    config: &Config,
    directory: Arc<dyn RepositoryDirectory>,
    scanner: ScanOrchestrator,
    metrics: Arc<dyn MetricsSink>,
    shutdown: &ShutdownSignal,
) -> Result<RunOutcome, RunError> {
    let started = Instant::now();
    let discovery = DiscoveryOrchestrator::new(
        directory,
        config.filter.clone(),
        config.ghe_concurrency,
        Arc::clone(&metrics),
    );

    let repositories = discovery.discover(config.target_org.as_deref()).await?;
    // Listings may be truncated once cancelled; nothing is scanned or written.
    if shutdown.is_cancelled() {
        return Err(DirectoryError::Cancelled.into());
    }
    log::info!(
        "repositories selected: {} ({:.2}s)",
        repositories.len(),
        started.elapsed().as_secs_f64()
    );

    let repository_count = repositories.len();
    let summaries = scanner.scan(repositories).await;
    push_summary_metrics(metrics.as_ref(), &summaries);

    let output = write_summaries(
        config.output_format.as_ref(),
        Some(config.output_file.as_path()),
        &summaries,
    )?;

    Ok(RunOutcome {
        repositories: repository_count,
        summaries: summaries.len(),
        output,
        cancelled: shutdown.is_cancelled(),
    })
}

fn finish(result: Result<RunOutcome, RunError>, metrics: &dyn MetricsSink, started: Instant) -> i32 {
    let code = report(result, metrics, started);
    metrics.flush();
    code
}

fn report(result: Result<RunOutcome, RunError>, metrics: &dyn MetricsSink, started: Instant) -> i32 {
    let elapsed = started.elapsed();
    metrics.gauge("took", elapsed.as_secs() as i64, &[]);

    match result {
        Ok(outcome) if outcome.cancelled => {
            log::warn!(
                "run cancelled; {} partial summaries written to {}",
                outcome.summaries,
                outcome.output.display()
            );
            metrics.service_check(ServiceStatus::Critical, "run cancelled");
            EXIT_CANCELLED
        }
        Ok(outcome) => {
            metrics.service_check(ServiceStatus::Ok, "OK");
            log::info!(
                "GitHub Enterprise reposec completed: {} repositories, {} summaries in {} ({:.2}s)",
                outcome.repositories,
                outcome.summaries,
                outcome.output.display(),
                elapsed.as_secs_f64()
            );
            0
        }
        Err(e) if e.is_cancelled() => {
            log::warn!("run cancelled before any output was written");
            metrics.service_check(ServiceStatus::Critical, "run cancelled");
            e.exit_code()
        }
        Err(e) => {
            log_error_with_context(&e, "GitHub Enterprise reposec failed");
            metrics.service_check(ServiceStatus::Critical, &e.to_string());
            e.exit_code()
        }
    }
}
