//! Shared value types for the Llemy pipeline domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! several fields and participate in the run: issue records flow from the
//! issue source to the stages, tickets flow from documents to the tracker, and
//! the run summary decides the process exit status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{lenient, IssueNumber, LabelName, LlemyError, RepositoryId};

// ---------------------------------------------------------------------------
// Issues
// ---------------------------------------------------------------------------

/// Identifies one unit of work: an issue in a repository.
///
/// Displayed as `owner/name#number`, the tag used in log lines and failure
/// entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IssueRef {
    /// Repository that owns the issue.
    #[serde(rename = "repo")]
    pub repository: RepositoryId,
    /// Issue number within the repository.
    pub number: IssueNumber,
}

impl IssueRef {
    /// Creates a new [`IssueRef`].
    pub fn new(repository: RepositoryId, number: IssueNumber) -> Self {
        Self { repository, number }
    }

    /// File-name stem for artefacts scoped to this issue (`owner_name_42`).
    pub fn artifact_stem(&self) -> String {
        format!("{}_{}", self.repository.slug(), self.number)
    }
}

impl std::fmt::Display for IssueRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.repository, self.number)
    }
}

// ---------------------------------------------------------------------------

/// An issue as returned by the issue source.
///
/// Only the fields the pipeline consumes are modelled. `body` is `None` when
/// the query did not request it.
///
/// Only `repo` and `number` must be well formed when reading; the descriptive
/// fields are read leniently (see [`crate::lenient`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRecord {
    /// Repository that owns the issue.
    #[serde(rename = "repo")]
    pub repository: RepositoryId,

    /// Issue number within the repository.
    pub number: IssueNumber,

    /// Issue title.
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,

    /// Browser URL of the issue.
    #[serde(default, deserialize_with = "lenient::string")]
    pub url: String,

    /// Last update time exactly as GitHub reported it.
    #[serde(
        default,
        deserialize_with = "lenient::optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<String>,

    /// Label names in the order GitHub returned them.
    #[serde(default, deserialize_with = "lenient::label_names")]
    pub labels: Vec<String>,

    /// Markdown body, when requested.
    #[serde(
        default,
        deserialize_with = "lenient::optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub body: Option<String>,
}

impl IssueRecord {
    /// Returns the [`IssueRef`] identifying this record.
    pub fn issue_ref(&self) -> IssueRef {
        IssueRef::new(self.repository.clone(), self.number)
    }

    /// Returns the body, or the empty string when absent.
    pub fn body_text(&self) -> &str {
        self.body.as_deref().unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Tickets
// ---------------------------------------------------------------------------

/// A structured ticket destined to become a newly created issue.
///
/// Produced by [`crate::documents::parse_todo_document`]; the constructor there
/// guarantees a non-empty title and body and the presence of the required
/// label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoTicket {
    /// Issue title.
    pub title: String,
    /// Labels to apply, required label first when it was injected.
    pub labels: Vec<LabelName>,
    /// Markdown body.
    pub body: String,
}

// ---------------------------------------------------------------------------
// Scan results
// ---------------------------------------------------------------------------

/// Outcome of listing one repository.
///
/// A repository is either listed or failed, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum RepositoryScan {
    /// Issues carrying the scanned label.
    Listed(Vec<IssueRecord>),
    /// Error message from the failed listing.
    Failed(String),
}

/// Per-repository outcomes of a scan, in the order the repositories were given.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanResult {
    entries: Vec<(RepositoryId, RepositoryScan)>,
}

impl ScanResult {
    /// Creates an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome for `repository`, replacing any earlier outcome.
    pub fn insert(&mut self, repository: RepositoryId, scan: RepositoryScan) {
        match self.entries.iter_mut().find(|(r, _)| *r == repository) {
            Some((_, existing)) => *existing = scan,
            None => self.entries.push((repository, scan)),
        }
    }

    /// Returns the outcome for `repository`, if it was scanned.
    pub fn get(&self, repository: &RepositoryId) -> Option<&RepositoryScan> {
        self.entries
            .iter()
            .find(|(r, _)| r == repository)
            .map(|(_, s)| s)
    }

    /// Iterates over `(repository, outcome)` pairs in scan order.
    pub fn iter(&self) -> impl Iterator<Item = (&RepositoryId, &RepositoryScan)> {
        self.entries.iter().map(|(r, s)| (r, s))
    }

    /// Iterates over every listed issue across all repositories.
    pub fn issues(&self) -> impl Iterator<Item = &IssueRecord> {
        self.entries.iter().flat_map(|(_, scan)| match scan {
            RepositoryScan::Listed(issues) => issues.as_slice(),
            RepositoryScan::Failed(_) => &[][..],
        })
    }

    /// Number of repositories whose listing failed.
    pub fn failed_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, s)| matches!(s, RepositoryScan::Failed(_)))
            .count()
    }
}

// ---------------------------------------------------------------------------
// Run summary
// ---------------------------------------------------------------------------

/// Aggregated outcome of one orchestrator run.
///
/// Any recorded failure makes the run a failure, even when other items
/// completed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    completed: usize,
    failures: Vec<String>,
}

impl RunSummary {
    /// Creates an empty summary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one successfully processed item.
    pub fn record_success(&mut self) {
        self.completed += 1;
    }

    /// Records a failed item as `owner/name#n: message`.
    pub fn record_failure(&mut self, issue: &IssueRef, error: &LlemyError) {
        self.failures.push(format!("{issue}: {error}"));
    }

    /// Number of completed items.
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Failure descriptions in the order they occurred.
    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    /// `true` when no failure was recorded.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Done. Completed={} Failed={}",
            self.completed,
            self.failures.len()
        )
    }
}

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

/// A label the workspace bootstrap creates or updates in a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelDefinition {
    /// Label name.
    pub name: LabelName,
    /// Six-digit hex colour without `#`.
    pub color: &'static str,
    /// Short description shown in the GitHub UI.
    pub description: &'static str,
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly. Serialises as an RFC 3339 string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Parses an RFC 3339 string, returning `None` if it is malformed.
    pub fn parse(value: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|dt| Self(dt.with_timezone(&Utc)))
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
