//! Scan stage: list labelled issues across repositories.
//!
//! Repositories are queried through the batch scheduler, so at most
//! `batch_size` listings are in flight. A repository whose listing fails is
//! recorded with its error message; it never aborts the scan.

use std::fmt::Write as _;
use std::sync::Arc;

use pipeline::{IssueQuery, IssueTracker, LabelName, RepositoryId, RepositoryScan, ScanResult};
use tracing::{info, warn};

use crate::batch::run_batches;

/// Lists issues carrying a label across a set of repositories.
pub struct ScanStage {
    tracker: Arc<dyn IssueTracker>,
    batch_size: usize,
    issue_limit: u32,
}

impl ScanStage {
    /// Creates a scan stage.
    pub fn new(tracker: Arc<dyn IssueTracker>, batch_size: usize, issue_limit: u32) -> Self {
        Self {
            tracker,
            batch_size,
            issue_limit,
        }
    }

    /// Scans `repositories` for open issues labelled `label`.
    pub async fn scan(
        &self,
        repositories: &[RepositoryId],
        label: &LabelName,
        include_body: bool,
    ) -> ScanResult {
        let query = IssueQuery {
            label: label.clone(),
            limit: self.issue_limit,
            include_body,
        };

        let outcomes = run_batches(repositories.to_vec(), self.batch_size, |repo| {
            let tracker = Arc::clone(&self.tracker);
            let query = &query;
            async move {
                let listed = tracker.list_issues(&repo, query).await;
                (repo, listed)
            }
        })
        .await;

        let mut result = ScanResult::new();
        for (repo, listed) in outcomes {
            match listed {
                Ok(issues) => {
                    info!(repo = %repo, count = issues.len(), %label, "Listed issues");
                    result.insert(repo, RepositoryScan::Listed(issues));
                }
                Err(e) => {
                    warn!(repo = %repo, error = %e, "Issue listing failed");
                    result.insert(repo, RepositoryScan::Failed(e.to_string()));
                }
            }
        }
        result
    }
}

/// Renders the human-readable scan report.
///
/// ```text
/// acme/widgets (2)
///   - #3 Add gears + https://github.com/acme/widgets/issues/3
///   - #5 Oil gears + https://github.com/acme/widgets/issues/5
/// acme/gadgets (0)
///   - ERROR: HTTP 404
/// ```
pub fn render_report(result: &ScanResult) -> String {
    let mut out = String::new();
    for (repo, scan) in result.iter() {
        match scan {
            RepositoryScan::Listed(issues) => {
                let _ = writeln!(out, "{repo} ({})", issues.len());
                for issue in issues {
                    let _ = writeln!(out, "  - #{} {} + {}", issue.number, issue.title, issue.url);
                }
            }
            RepositoryScan::Failed(error) => {
                let _ = writeln!(out, "{repo} (0)");
                let _ = writeln!(out, "  - ERROR: {error}");
            }
        }
    }
    out
}
