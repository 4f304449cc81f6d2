//! Error taxonomy for the Llemy pipeline domain.
//!
//! [`LlemyError`] is shared by every crate in the workspace: infrastructure
//! adapters produce it, the orchestration layer records it per issue, and the
//! CLI reports it. Variants map one-to-one onto the failure classes the
//! orchestrator distinguishes.
//!
//! ## Fatal vs per-item
//!
//! - Fatal (abort before any item is processed): [`LlemyError::NotReady`],
//!   [`LlemyError::RepositoryResolution`], [`LlemyError::Configuration`],
//!   [`LlemyError::NoWorkItems`], and scan-payload load failures.
//! - Per-item (recorded in the run summary, processing continues): everything
//!   raised while processing one issue.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Convenience alias used throughout the workspace.
pub type Result<T, E = LlemyError> = std::result::Result<T, E>;

/// Errors raised by the Llemy pipeline and its infrastructure adapters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LlemyError {
    /// An external program exited non-zero, was killed by a signal, or could
    /// not be started.
    ///
    /// `detail` carries captured stderr, or stdout when stderr was empty, or
    /// the spawn error.
    #[error("{program} failed: {detail}")]
    ExternalCommand {
        /// Program that was invoked (e.g. `gh`, `codex`).
        program: String,
        /// Trimmed diagnostic text.
        detail: String,
    },

    /// An external program was still running when its timeout elapsed.
    #[error("{program} timed out after {}s", timeout.as_secs())]
    CommandTimeout {
        /// Program that was invoked.
        program: String,
        /// Configured timeout.
        timeout: Duration,
    },

    /// Structured output from an external source was not well-formed.
    #[error("{message}")]
    Query {
        /// Description of what could not be parsed.
        message: String,
    },

    /// A document did not yield a usable ticket (missing title or body).
    #[error("{message}")]
    Validation {
        /// Description of the missing field.
        message: String,
    },

    /// Neither the configured override nor the ambient repository context
    /// produced a usable `owner/name`.
    #[error("Unable to resolve current repository. Run inside a GitHub repo or set LLEMY_REPO=owner/name")]
    RepositoryResolution,

    /// The handoff artefact never appeared within the polling budget.
    #[error("Timeout waiting for {} to be created after {attempts} attempts", path.display())]
    HandoffTimeout {
        /// Path that was polled.
        path: PathBuf,
        /// Number of polls performed.
        attempts: u32,
    },

    /// Both the remove-and-add label edit and the add-only fallback failed.
    #[error("label update on {issue} failed: {detail} (initial remove-and-add failed: {removal_detail})")]
    LabelUpdate {
        /// `owner/name#number` tag of the issue.
        issue: String,
        /// Failure of the add-only fallback.
        detail: String,
        /// Failure of the original remove-and-add call.
        removal_detail: String,
    },

    /// A required external tool is missing or unauthenticated.
    #[error("{tool} CLI not available or not authenticated: {detail}")]
    NotReady {
        /// Tool that failed its readiness check.
        tool: String,
        /// Underlying failure.
        detail: String,
    },

    /// The runtime configuration is invalid or incomplete.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },

    /// A local artefact (scan payload, plan file, todo file) could not be read
    /// or written.
    #[error("{message}: {}", path.display())]
    Artifact {
        /// Artefact path.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// The scan payload contained no well-formed work items.
    #[error("No issues to process in {}", path.display())]
    NoWorkItems {
        /// Scan payload that was read.
        path: PathBuf,
    },

    /// The hosted LLM API returned an error or an unexpected response shape.
    #[error("Claude API error: {message}")]
    LlmProvider {
        /// Status and body, or the parse failure.
        message: String,
    },
}

impl LlemyError {
    /// Shorthand for an [`LlemyError::Artifact`] built from an I/O error.
    pub fn artifact(path: impl Into<PathBuf>, source: &std::io::Error) -> Self {
        Self::Artifact {
            path: path.into(),
            message: source.to_string(),
        }
    }

    /// Returns `true` for the timeout class (handoff or command timeout).
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::HandoffTimeout { .. } | Self::CommandTimeout { .. })
    }
}
