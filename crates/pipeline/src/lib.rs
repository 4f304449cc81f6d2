//! Core orchestration domain for Llemy.
//!
//! Llemy drives a two-stage GitHub issue workflow: issues labelled for planning
//! become implementation tickets, and tickets labelled ready are handed to a
//! coding agent and closed out. This crate contains every domain concept,
//! newtype identifier, shared value type, port trait, and the error taxonomy
//! used throughout the workspace. Infrastructure crates implement the traits
//! defined here; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; infrastructure crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype domain identifiers (`RepositoryId`, `IssueNumber`, etc.) |
//! | [`types`] | Shared value types (`IssueRef`, `IssueRecord`, `RunSummary`, etc.) |
//! | [`errors`] | The `LlemyError` taxonomy |
//! | [`config`] | `LlemyConfig` and its documented defaults |
//! | [`ports`] | Traits implemented by infrastructure crates |
//! | [`labels`] | The per-issue label state machine |
//! | [`documents`] | Plan and todo document grammar |
//! | [`payload`] | Scan payload file format |
//! | [`lenient`] | Forgiving readers for externally written JSON fields |

pub mod config;
pub mod documents;
pub mod errors;
pub mod identifiers;
pub mod labels;
pub mod lenient;
pub mod payload;
pub mod ports;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use config::{AgentConfig, LlemyConfig, LlmConfig, Paths, PollPolicy, StageLabels};
pub use documents::{
    parse_todo_document, render_plan_document, render_todo_document, PlanDocument,
};
pub use errors::{LlemyError, Result};
pub use identifiers::{IssueNumber, LabelName, PipelineRunId, RepositoryId};
pub use labels::{transition, TransitionOutcome};
pub use payload::{ScanEntry, ScanPayload};
pub use ports::{
    ArtifactProbe, CodingAgent, CommandInvocation, CommandRunner, IssueQuery, IssueTracker,
    TicketGenerator,
};
pub use types::{
    IssueRecord, IssueRef, LabelDefinition, RepositoryScan, RunSummary, ScanResult, Timestamp,
    TodoTicket,
};

/// Resolves the repository to operate on.
///
/// An explicit override is used verbatim; otherwise the tracker is asked for
/// the repository of the working directory, once.
///
/// # Errors
///
/// [`LlemyError::RepositoryResolution`] when neither source yields a usable
/// `owner/name`.
pub async fn resolve_repository(
    tracker: &dyn IssueTracker,
    repository_override: Option<&RepositoryId>,
) -> Result<RepositoryId> {
    if let Some(repo) = repository_override {
        return Ok(repo.clone());
    }
    tracker
        .current_repository()
        .await
        .map_err(|e| {
            tracing::debug!(error = %e, "Ambient repository lookup failed");
            LlemyError::RepositoryResolution
        })
}
