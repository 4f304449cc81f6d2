//! Scan payload: the JSON snapshot handed from a scan to a processing run.
//!
//! ```json
//! {
//!   "generatedAt": "2024-05-01T10:00:00Z",
//!   "label": "llemy-plan",
//!   "repos": ["acme/widgets"],
//!   "issues": [
//!     { "repo": "acme/widgets", "number": 3, "title": "...", "url": "...",
//!       "updatedAt": "...", "labels": ["llemy-plan"] },
//!     { "repo": "acme/gadgets", "error": "HTTP 404" }
//!   ]
//! }
//! ```
//!
//! The payload is written by one run and read by another, possibly after
//! hand edits, so reading is tolerant: entries that are not well-formed work
//! items are skipped rather than failing the whole file. A work item needs
//! only a repository and a positive number; odd titles, labels or timestamps
//! never disqualify it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    IssueNumber, IssueRecord, IssueRef, LabelName, RepositoryId, RepositoryScan, ScanResult,
    Timestamp,
};

/// One entry of [`ScanPayload::issues`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScanEntry {
    /// A repository whose listing failed.
    Failed {
        /// Repository that failed.
        repo: String,
        /// Error message.
        error: String,
    },
    /// A listed issue.
    Issue(IssueRecord),
    /// Anything else; preserved but never processed.
    Other(Value),
}

/// The scan payload file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanPayload {
    /// When the scan ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<Timestamp>,
    /// Label that was scanned.
    #[serde(default)]
    pub label: String,
    /// Repositories that were scanned.
    #[serde(default)]
    pub repos: Vec<String>,
    /// Listed issues and failed repositories.
    #[serde(default)]
    pub issues: Vec<ScanEntry>,
}

impl ScanPayload {
    /// Builds the payload for `result`, preserving repository order.
    pub fn from_scan(label: &LabelName, result: &ScanResult, generated_at: Timestamp) -> Self {
        let mut issues = Vec::new();
        for (repo, scan) in result.iter() {
            match scan {
                RepositoryScan::Listed(records) => {
                    issues.extend(records.iter().cloned().map(ScanEntry::Issue));
                }
                RepositoryScan::Failed(error) => issues.push(ScanEntry::Failed {
                    repo: repo.to_string(),
                    error: error.clone(),
                }),
            }
        }

        Self {
            generated_at: Some(generated_at),
            label: label.to_string(),
            repos: result.iter().map(|(r, _)| r.to_string()).collect(),
            issues,
        }
    }

    /// Returns the well-formed work items: entries with a non-blank
    /// repository, a positive issue number, and no error marker.
    pub fn work_items(&self) -> Vec<IssueRef> {
        self.issues
            .iter()
            .filter_map(|entry| match entry {
                ScanEntry::Issue(record) => Some(IssueRef::new(
                    RepositoryId::new(record.repository.as_str())?,
                    IssueNumber::new(record.number.as_u64())?,
                )),
                ScanEntry::Failed { .. } | ScanEntry::Other(_) => None,
            })
            .collect()
    }
}
