//! Implementation stage: hand `todo` tickets to the coding agent.
//!
//! Per work item the issue is fetched, an implementation prompt is built from
//! it, and the agent runs inside the working tree. The agent's summary is
//! posted as a completion comment and the issue moves from `todo` to `done`.
//! The comment is posted before relabelling, so a failed relabel still leaves
//! a record of the work on the issue.

use std::path::PathBuf;
use std::sync::Arc;

use pipeline::{
    transition, CodingAgent, IssueRecord, IssueRef, IssueTracker, LlemyError, RunSummary,
    StageLabels,
};
use tracing::info;

use crate::run::process_each;

const EMPTY_SUMMARY: &str = "Implementation completed. (No summary text returned)";

/// Builds the prompt handed to the coding agent for `issue`.
pub fn implementation_prompt(issue: &IssueRecord) -> String {
    let body = issue.body_text();
    let body = if body.trim().is_empty() {
        "_No issue body_"
    } else {
        body
    };
    let title = if issue.title.is_empty() {
        "_Untitled_"
    } else {
        issue.title.as_str()
    };

    [
        format!("Implement GitHub issue {} exactly as written.", issue.issue_ref()),
        format!("Issue title: {title}"),
        format!("Issue URL: {}", issue.url),
        String::new(),
        "Issue body:".to_string(),
        body.to_string(),
        String::new(),
        "Execution requirements:".to_string(),
        "- Apply the requested changes in this repository.".to_string(),
        "- Keep the implementation faithful to the issue text.".to_string(),
        "- Run any relevant verification commands and include their outcomes.".to_string(),
        "- Return a concise completion summary with changed files and checks run.".to_string(),
    ]
    .join("\n")
}

/// Formats the completion comment posted after a successful agent run.
pub fn completion_comment(agent: &str, summary: &str) -> String {
    let summary = summary.trim();
    let summary = if summary.is_empty() {
        EMPTY_SUMMARY
    } else {
        summary
    };
    format!("✅ Implementation completed by {agent}\n\n{summary}")
}

/// Drives the `todo → done` half of the workflow.
pub struct ImplementStage {
    tracker: Arc<dyn IssueTracker>,
    agent: Arc<dyn CodingAgent>,
    labels: StageLabels,
    working_dir: PathBuf,
}

impl ImplementStage {
    /// Creates an implementation stage running the agent in `working_dir`.
    pub fn new(
        tracker: Arc<dyn IssueTracker>,
        agent: Arc<dyn CodingAgent>,
        labels: StageLabels,
        working_dir: PathBuf,
    ) -> Self {
        Self {
            tracker,
            agent,
            labels,
            working_dir,
        }
    }

    /// Processes every work item and returns the run summary.
    pub async fn run(&self, items: &[IssueRef]) -> RunSummary {
        process_each(items, |item| self.process(item)).await
    }

    /// Processes one work item.
    pub async fn process(&self, item: &IssueRef) -> Result<(), LlemyError> {
        info!(issue = %item, "Fetching issue...");
        let issue = self.tracker.fetch_issue(item).await?;
        let prompt = implementation_prompt(&issue);

        info!(issue = %item, agent = self.agent.name(), "Running implementation...");
        let summary = self.agent.implement(&prompt, &self.working_dir).await?;

        info!(issue = %item, "Adding completion comment...");
        let comment = completion_comment(self.agent.name(), &summary);
        self.tracker.comment(item, &comment).await?;

        info!(issue = %item, "Relabeling issue...");
        transition(
            self.tracker.as_ref(),
            item,
            &self.labels.todo,
            &self.labels.done,
        )
        .await?;

        info!(issue = %item, "Implemented and labeled {}", self.labels.done);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pipeline::{IssueNumber, RepositoryId};

    use super::*;

    fn issue(title: &str, body: Option<&str>) -> IssueRecord {
        IssueRecord {
            repository: RepositoryId::new("acme/widgets").unwrap(),
            number: IssueNumber::new(9).unwrap(),
            title: title.into(),
            url: "https://github.com/acme/widgets/issues/9".into(),
            updated_at: None,
            labels: Vec::new(),
            body: body.map(Into::into),
        }
    }

    #[test]
    fn prompt_carries_issue_identity_and_body() {
        let prompt = implementation_prompt(&issue("Add gears", Some("Use brass.")));
        let lines: Vec<_> = prompt.lines().collect();
        assert_eq!(lines[0], "Implement GitHub issue acme/widgets#9 exactly as written.");
        assert_eq!(lines[1], "Issue title: Add gears");
        assert_eq!(lines[2], "Issue URL: https://github.com/acme/widgets/issues/9");
        assert_eq!(lines[4], "Issue body:");
        assert_eq!(lines[5], "Use brass.");
        assert_eq!(lines[7], "Execution requirements:");
        assert_eq!(lines.len(), 12);
    }

    #[test]
    fn prompt_uses_placeholders_for_missing_fields() {
        let prompt = implementation_prompt(&issue("", Some("   ")));
        assert!(prompt.contains("Issue title: _Untitled_"));
        assert!(prompt.contains("Issue body:\n_No issue body_\n"));
    }

    #[test]
    fn empty_summary_gets_default_text() {
        assert_eq!(
            completion_comment("Codex", "  \n"),
            "✅ Implementation completed by Codex\n\nImplementation completed. (No summary text returned)"
        );
        assert_eq!(
            completion_comment("Codex", "Changed src/lib.rs\n"),
            "✅ Implementation completed by Codex\n\nChanged src/lib.rs"
        );
    }
}
