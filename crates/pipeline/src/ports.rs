//! Port traits implemented by the infrastructure crates.
//!
//! The orchestration layer depends only on these traits. Concrete adapters
//! live in `process` ([`CommandRunner`]), `github` ([`IssueTracker`]) and
//! `llm` ([`TicketGenerator`], [`CodingAgent`]); tests substitute in-memory
//! fakes.
//!
//! All traits are `Send + Sync` and use `async_trait` so they can be held as
//! `Arc<dyn Trait>`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::{
    IssueRecord, IssueRef, LabelDefinition, LabelName, LlemyError, RepositoryId, TodoTicket,
};

// ---------------------------------------------------------------------------
// External commands
// ---------------------------------------------------------------------------

/// One external program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    /// Program name or path.
    pub program: String,
    /// Arguments, passed verbatim (no shell).
    pub args: Vec<String>,
    /// Working directory; `None` inherits the caller's.
    pub working_dir: Option<PathBuf>,
    /// Kill the process and fail once this elapses.
    pub timeout: Option<Duration>,
}

impl CommandInvocation {
    /// Creates an invocation of `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            timeout: None,
        }
    }

    /// Appends arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the working directory.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Sets the timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Runs external programs.
///
/// Returns trimmed stdout on success. Non-zero exit, signal termination and
/// spawn failures map to [`LlemyError::ExternalCommand`]; an elapsed timeout
/// maps to [`LlemyError::CommandTimeout`]. One child process per call, no
/// retries.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Executes `invocation` and waits for it to finish.
    async fn run(&self, invocation: &CommandInvocation) -> Result<String, LlemyError>;
}

// ---------------------------------------------------------------------------
// Issue tracker
// ---------------------------------------------------------------------------

/// Parameters of an issue listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueQuery {
    /// Only open issues carrying this label are listed.
    pub label: LabelName,
    /// Maximum number of issues returned.
    pub limit: u32,
    /// Whether to request issue bodies.
    pub include_body: bool,
}

/// The source-control host, as seen by the pipeline.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Verifies that the tracker is installed and authenticated.
    async fn check_ready(&self) -> Result<(), LlemyError>;

    /// Returns the `owner/name` of the repository in the working directory.
    async fn current_repository(&self) -> Result<RepositoryId, LlemyError>;

    /// Lists open issues in `repository` matching `query`.
    async fn list_issues(
        &self,
        repository: &RepositoryId,
        query: &IssueQuery,
    ) -> Result<Vec<IssueRecord>, LlemyError>;

    /// Fetches one issue including its body.
    async fn fetch_issue(&self, issue: &IssueRef) -> Result<IssueRecord, LlemyError>;

    /// Files `ticket` as a new issue and returns the new issue's URL.
    async fn create_issue(
        &self,
        repository: &RepositoryId,
        ticket: &TodoTicket,
    ) -> Result<String, LlemyError>;

    /// Adds `add` to `issue`, removing `remove` in the same call when given.
    async fn edit_labels(
        &self,
        issue: &IssueRef,
        remove: Option<&LabelName>,
        add: &LabelName,
    ) -> Result<(), LlemyError>;

    /// Posts a comment on `issue`.
    async fn comment(&self, issue: &IssueRef, body: &str) -> Result<(), LlemyError>;

    /// Lists the names of all labels defined in `repository`.
    async fn list_labels(&self, repository: &RepositoryId) -> Result<Vec<String>, LlemyError>;

    /// Creates `label` in `repository`, or updates it when `exists` is true.
    async fn upsert_label(
        &self,
        repository: &RepositoryId,
        label: &LabelDefinition,
        exists: bool,
    ) -> Result<(), LlemyError>;
}

// ---------------------------------------------------------------------------
// Agents and artefacts
// ---------------------------------------------------------------------------

/// An automated coding agent that implements a ticket in a working tree.
#[async_trait]
pub trait CodingAgent: Send + Sync {
    /// Human-readable agent name used in completion comments.
    fn name(&self) -> &str;

    /// Verifies that the agent CLI is available.
    async fn check_ready(&self) -> Result<(), LlemyError>;

    /// Runs the agent on `prompt` inside `working_dir` and returns its
    /// completion summary.
    async fn implement(&self, prompt: &str, working_dir: &Path) -> Result<String, LlemyError>;
}

/// Generates todo document text from a plan document.
#[async_trait]
pub trait TicketGenerator: Send + Sync {
    /// Returns the generated document for `plan_document` under `policy`.
    async fn generate(&self, policy: &str, plan_document: &str) -> Result<String, LlemyError>;
}

/// Checks whether a handoff artefact exists.
#[async_trait]
pub trait ArtifactProbe: Send + Sync {
    /// `true` once something exists at `path`.
    async fn exists(&self, path: &Path) -> bool;
}
