//! Scan API
//!
//! Public surface of the scan stage used by the app driver and tests.

pub use crate::scan::aggregator::{RepositoryBatch, ResultAggregator};
pub use crate::scan::error::{PersistError, ScanError, ScanResult};
pub use crate::scan::invocation::Invocation;
pub use crate::scan::orchestrator::{parse_report, ScanOrchestrator, WorkQueue};
pub use crate::scan::persist::{org_and_repo, RawResultStore};
pub use crate::scan::runner::{ProcessOutput, ProcessRunner, ScannerRunner};
pub use crate::scan::types::{Finding, ResourceTable, ScanConfig, Summary};
