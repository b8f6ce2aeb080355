//! Discovery Orchestrator
//!
//! Fans out one listing task per organization, bounded by a shared semaphore,
//! and merges the selected addresses as the tasks complete.

use crate::core::validation::effective_concurrency;
use crate::directory::client::RepositoryDirectory;
use crate::directory::error::DirectoryResult;
use crate::directory::types::RepositoryAddress;
use crate::discovery::filter::{evaluate, ExclusionReason, FilterDecision, FilterPolicy};
use crate::metrics::MetricsSink;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use strum::IntoEnumIterator;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;

/// Result of listing one organization
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizationListing {
    pub organization: String,
    /// Selected clone addresses in pagination order
    pub selected: Vec<RepositoryAddress>,
    pub excluded: HashMap<ExclusionReason, i64>,
    /// Page error that cut the listing short, if any
    pub error: Option<String>,
}

impl OrganizationListing {
    fn new(organization: &str) -> Self {
        Self {
            organization: organization.to_string(),
            ..Default::default()
        }
    }

    pub fn excluded_count(&self, reason: ExclusionReason) -> i64 {
        self.excluded.get(&reason).copied().unwrap_or(0)
    }

    pub fn is_partial(&self) -> bool {
        self.error.is_some()
    }
}

/// Runs the discovery stage for one run
pub struct DiscoveryOrchestrator {
    directory: Arc<dyn RepositoryDirectory>,
    policy: Arc<FilterPolicy>,
    concurrency: usize,
    metrics: Arc<dyn MetricsSink>,
}

impl DiscoveryOrchestrator {
    pub fn new(
        directory: Arc<dyn RepositoryDirectory>,
        policy: FilterPolicy,
        concurrency: i64,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            directory,
            policy: Arc::new(policy),
            concurrency: effective_concurrency(concurrency),
            metrics,
        }
    }

    /// Effective number of simultaneous organization listings
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Collect the addresses of every repository worth scanning
    ///
    /// Only a failure to list the organization set is returned as an error;
    /// page errors truncate the affected organization and are logged.
    pub async fn discover(&self, target_org: Option<&str>) -> DirectoryResult<Vec<RepositoryAddress>> {
        let listings = self.discover_listings(target_org).await?;
        Ok(listings.into_iter().flat_map(|l| l.selected).collect())
    }

    /// Per-organization listings in completion order
    pub async fn discover_listings(
        &self,
        target_org: Option<&str>,
    ) -> DirectoryResult<Vec<OrganizationListing>> {
        let orgs = match target_org {
            Some(org) => vec![org.to_string()],
            None => self.directory.organizations().await?,
        };
        log::info!(
            "discovering repositories in {} organizations ({} concurrent)",
            orgs.len(),
            self.concurrency
        );
        self.metrics.gauge("organizations", orgs.len() as i64, &[]);

        let now = Utc::now();
        let semaphore = Arc::new(Semaphore::new(self.concurrency.min(Semaphore::MAX_PERMITS)));
        let (tx, mut rx) = mpsc::unbounded_channel::<OrganizationListing>();
        let mut tasks = JoinSet::new();

        for org in orgs {
            let directory = Arc::clone(&self.directory);
            let policy = Arc::clone(&self.policy);
            let semaphore = Arc::clone(&semaphore);
            let tx = tx.clone();
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                let listing = list_organization(directory.as_ref(), &org, &policy, now).await;
                if tx.send(listing).is_err() {
                    log::debug!("discovery merge closed before {} finished", org);
                }
            });
        }
        drop(tx);

        let mut listings = Vec::new();
        while let Some(listing) = rx.recv().await {
            self.push_listing_metrics(&listing);
            listings.push(listing);
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                log::error!("organization listing task failed: {}", e);
            }
        }

        let total: usize = listings.iter().map(|l| l.selected.len()).sum();
        log::info!("discovery selected {} repositories", total);
        Ok(listings)
    }

    fn push_listing_metrics(&self, listing: &OrganizationListing) {
        let org_tag = format!("organization:{}", listing.organization);
        for reason in ExclusionReason::iter() {
            self.metrics.gauge(
                "repositories",
                listing.excluded_count(reason),
                &[format!("status:{}", reason), org_tag.clone()],
            );
        }
        self.metrics.gauge(
            "repositories",
            listing.selected.len() as i64,
            &["status:selected".to_string(), org_tag],
        );
    }
}

/// Walk one organization's pages, filtering as they arrive
async fn list_organization(
    directory: &dyn RepositoryDirectory,
    org: &str,
    policy: &FilterPolicy,
    now: DateTime<Utc>,
) -> OrganizationListing {
    log::debug!("listing repositories of {}", org);
    let mut listing = OrganizationListing::new(org);
    let mut pages = directory.repository_pages(org);

    while let Some(page) = pages.next().await {
        let repos = match page {
            Ok(repos) => repos,
            Err(e) => {
                log::error!("error listing repositories of {}: {}", org, e);
                listing.error = Some(e.to_string());
                break;
            }
        };
        for repo in repos {
            match evaluate(&repo, policy, now) {
                FilterDecision::Included => listing.selected.push(repo.clone_url),
                FilterDecision::Excluded(reason) => {
                    log::warn!("{}: {}", reason.description(), repo.full_name);
                    *listing.excluded.entry(reason).or_insert(0) += 1;
                }
            }
        }
    }

    log::debug!(
        "listing of {} finished: {} selected",
        org,
        listing.selected.len()
    );
    listing
}
