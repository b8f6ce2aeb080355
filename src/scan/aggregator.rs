//! Result Aggregator
//!
//! Collects per-repository batches as workers finish them and flattens them
//! into the run's summary collection.

use crate::scan::types::Summary;
use tokio::sync::mpsc;

/// Batch of summaries produced by scanning one repository
#[derive(Debug, Clone)]
pub struct RepositoryBatch {
    pub address: String,
    pub summaries: Vec<Summary>,
}

#[derive(Debug, Default)]
pub struct ResultAggregator {
    summaries: Vec<Summary>,
    repositories: usize,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one batch, logging every summary
    pub fn push(&mut self, batch: RepositoryBatch) {
        self.repositories += 1;
        for summary in batch.summaries {
            log::info!(
                "live repository summary: repository={} control_in_place={} controls={} number_of_controls={} error={:?}",
                summary.repository(),
                summary.control_in_place(),
                summary.controls().join("#"),
                summary.number_of_controls(),
                summary.error()
            );
            self.summaries.push(summary);
        }
    }

    /// Drain the merge channel until every sender is gone
    pub async fn collect(mut self, mut rx: mpsc::Receiver<RepositoryBatch>) -> Self {
        while let Some(batch) = rx.recv().await {
            self.push(batch);
        }
        self
    }

    /// Number of repository batches received
    pub fn repositories(&self) -> usize {
        self.repositories
    }

    pub fn finish(self) -> Vec<Summary> {
        log::debug!(
            "aggregated {} summaries from {} repositories",
            self.summaries.len(),
            self.repositories
        );
        self.summaries
    }
}
