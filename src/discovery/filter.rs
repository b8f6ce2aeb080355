//! Repository Filter
//!
//! Decides whether a listed repository is worth scanning. Predicates are
//! evaluated in a fixed order and the first failing one names the exclusion
//! reason used in logs and metrics.

use crate::directory::types::RepositoryMetadata;
use chrono::{DateTime, Duration, Utc};

/// Default size ceiling in KB (3 GB)
pub const DEFAULT_SIZE_LIMIT_KB: u64 = 3_145_728;

/// Inclusion policy for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterPolicy {
    /// Repositories larger than this (KB) are never scanned
    pub size_limit_kb: u64,
    pub include_archived: bool,
    pub include_empty: bool,
    pub include_forks: bool,
    pub include_templates: bool,
    pub include_disabled: bool,
    /// Minimum recency in days; zero or below disables the check
    pub min_last_activity_days: i64,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self {
            size_limit_kb: DEFAULT_SIZE_LIMIT_KB,
            include_archived: false,
            include_empty: false,
            include_forks: false,
            include_templates: false,
            include_disabled: false,
            min_last_activity_days: 0,
        }
    }
}

/// Why a repository was left out
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum_macros::Display,
    strum_macros::AsRefStr,
    strum_macros::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum ExclusionReason {
    TooBig,
    Empty,
    Archived,
    Disabled,
    Fork,
    Template,
    Inactive,
}

impl ExclusionReason {
    /// Log line used when a repository is skipped for this reason
    pub fn description(&self) -> &'static str {
        match self {
            ExclusionReason::TooBig => "repository is too big, skipping",
            ExclusionReason::Empty => "repository is empty, skipping",
            ExclusionReason::Archived => "repository is archived, skipping",
            ExclusionReason::Disabled => "repository is disabled, skipping",
            ExclusionReason::Fork => "repository is a fork, skipping",
            ExclusionReason::Template => "repository is a template, skipping",
            ExclusionReason::Inactive => "repository has not been active for a while, skipping",
        }
    }
}

/// Outcome of evaluating one repository against the policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    Included,
    Excluded(ExclusionReason),
}

impl FilterDecision {
    pub fn is_included(&self) -> bool {
        matches!(self, FilterDecision::Included)
    }
}

/// Evaluate the policy predicates in order, stopping at the first failure
pub fn evaluate(meta: &RepositoryMetadata, policy: &FilterPolicy, now: DateTime<Utc>) -> FilterDecision {
    // An unknown size is neither too big nor empty.
    let excluded = if meta.size.is_some_and(|size| size > policy.size_limit_kb) {
        Some(ExclusionReason::TooBig)
    } else if meta.size == Some(0) && !policy.include_empty {
        Some(ExclusionReason::Empty)
    } else if meta.archived && !policy.include_archived {
        Some(ExclusionReason::Archived)
    } else if meta.disabled && !policy.include_disabled {
        Some(ExclusionReason::Disabled)
    } else if meta.fork && !policy.include_forks {
        Some(ExclusionReason::Fork)
    } else if meta.is_template && !policy.include_templates {
        Some(ExclusionReason::Template)
    } else if is_inactive(meta, policy.min_last_activity_days, now) {
        Some(ExclusionReason::Inactive)
    } else {
        None
    };

    match excluded {
        Some(reason) => FilterDecision::Excluded(reason),
        None => FilterDecision::Included,
    }
}

/// True when the repository should be scanned
pub fn include(meta: &RepositoryMetadata, policy: &FilterPolicy, now: DateTime<Utc>) -> bool {
    evaluate(meta, policy, now).is_included()
}

// Both timestamps must be stale; a missing timestamp never counts as stale.
fn is_inactive(meta: &RepositoryMetadata, min_days: i64, now: DateTime<Utc>) -> bool {
    if min_days <= 0 {
        return false;
    }
    let Some(threshold) = Duration::try_days(min_days).and_then(|d| now.checked_sub_signed(d))
    else {
        return false;
    };
    let stale = |ts: Option<DateTime<Utc>>| ts.is_some_and(|t| t < threshold);
    stale(meta.updated_at) && stale(meta.pushed_at)
}
