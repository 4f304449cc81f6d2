//! Shared run loop for the processing stages.

use std::future::Future;
use std::path::Path;

use pipeline::{IssueRef, LlemyError, RunSummary};
use tracing::{error, info};

use crate::artifacts::load_payload;

/// Loads the scan payload at `path` and returns its well-formed work items.
///
/// # Errors
///
/// Fatal startup errors: the payload is missing or invalid
/// ([`LlemyError::Artifact`]) or holds no work items
/// ([`LlemyError::NoWorkItems`]).
pub async fn load_work_items(path: &Path) -> Result<Vec<IssueRef>, LlemyError> {
    let items = load_payload(path).await?.work_items();
    if items.is_empty() {
        return Err(LlemyError::NoWorkItems {
            path: path.to_path_buf(),
        });
    }
    info!(count = items.len(), path = %path.display(), "Loaded work items");
    Ok(items)
}

/// Runs `process` on each item in order, recording every outcome.
///
/// A failure is logged and recorded as `owner/name#n: message`; the next item
/// starts regardless.
pub async fn process_each<'a, F, Fut, T>(items: &'a [IssueRef], process: F) -> RunSummary
where
    F: Fn(&'a IssueRef) -> Fut,
    Fut: Future<Output = Result<T, LlemyError>>,
{
    let mut summary = RunSummary::new();
    for item in items {
        match process(item).await {
            Ok(_) => summary.record_success(),
            Err(e) => {
                error!(issue = %item, error = %e, "Failed {item}: {e}");
                summary.record_failure(item, &e);
            }
        }
    }
    info!(
        completed = summary.completed(),
        failed = summary.failures().len(),
        "{summary}"
    );
    summary
}
