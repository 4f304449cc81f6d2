//! Plan stage: turn `plan`-labelled issues into `todo` tickets.
//!
//! Per work item:
//!
//! 1. fetch the issue,
//! 2. write the plan document to `<plan_dir>/<slug>_<n>_plan.md`,
//! 3. obtain the todo document at `<todo_dir>/<slug>_<n>_todo.md`, either by
//!    waiting for an external planner ([`TicketSource::Handoff`]) or by asking
//!    the hosted model ([`TicketSource::Generated`]),
//! 4. parse it into a ticket and file it,
//! 5. move the original issue from `plan` to `planned`.
//!
//! Items are processed one at a time; a failing item is recorded and the next
//! one starts.

use std::path::PathBuf;
use std::sync::Arc;

use pipeline::{
    parse_todo_document, render_plan_document, transition, IssueRef, IssueTracker, LlemyError,
    RunSummary, StageLabels, TicketGenerator,
};
use tracing::info;

use crate::artifacts::{read_text, write_text};
use crate::handoff::HandoffWaiter;
use crate::run::process_each;

/// Where the todo document comes from.
#[derive(Clone)]
pub enum TicketSource {
    /// Wait for an out-of-band planner to write the todo document.
    Handoff(HandoffWaiter),
    /// Generate the todo document with the hosted model.
    Generated {
        /// Model adapter.
        generator: Arc<dyn TicketGenerator>,
        /// Policy text prepended to every prompt.
        policy: String,
    },
}

/// Directories the plan stage writes to.
#[derive(Debug, Clone)]
pub struct PlanDirs {
    /// Plan documents.
    pub plan_dir: PathBuf,
    /// Todo documents.
    pub todo_dir: PathBuf,
}

/// Drives the `plan → planned` half of the workflow.
pub struct PlanStage {
    tracker: Arc<dyn IssueTracker>,
    source: TicketSource,
    labels: StageLabels,
    dirs: PlanDirs,
}

impl PlanStage {
    /// Creates a plan stage.
    pub fn new(
        tracker: Arc<dyn IssueTracker>,
        source: TicketSource,
        labels: StageLabels,
        dirs: PlanDirs,
    ) -> Self {
        Self {
            tracker,
            source,
            labels,
            dirs,
        }
    }

    /// Processes every work item and returns the run summary.
    pub async fn run(&self, items: &[IssueRef]) -> RunSummary {
        process_each(items, |item| self.process(item)).await
    }

    /// Processes one work item and returns the URL of the filed ticket.
    pub async fn process(&self, item: &IssueRef) -> Result<String, LlemyError> {
        info!(issue = %item, "Fetching issue...");
        let issue = self.tracker.fetch_issue(item).await?;

        let stem = item.artifact_stem();
        let plan_path = self.dirs.plan_dir.join(format!("{stem}_plan.md"));
        let todo_path = self.dirs.todo_dir.join(format!("{stem}_todo.md"));

        info!(issue = %item, path = %plan_path.display(), "Writing plan");
        let plan = render_plan_document(&issue);
        write_text(&plan_path, &plan).await?;

        match &self.source {
            TicketSource::Handoff(waiter) => {
                info!(
                    issue = %item,
                    "Paused - run this in Claude Code to continue: \"Process plan file {} and create {}\"",
                    plan_path.display(),
                    todo_path.display()
                );
                waiter.await_artifact(&todo_path).await?;
                info!(issue = %item, "Todo file detected, continuing...");
            }
            TicketSource::Generated { generator, policy } => {
                info!(issue = %item, "Calling Claude API to generate todo...");
                let generated = generator.generate(policy, &plan).await?;
                info!(issue = %item, path = %todo_path.display(), "Writing todo");
                write_text(&todo_path, &generated).await?;
            }
        }

        let text = read_text(&todo_path).await?;
        let fallback = format!("Plan for {item}");
        let ticket = parse_todo_document(&text, &fallback, &self.labels.todo).map_err(|e| {
            match e {
                LlemyError::Validation { message } => LlemyError::Validation {
                    message: format!("{message} in {}", todo_path.display()),
                },
                other => other,
            }
        })?;

        info!(issue = %item, title = %ticket.title, "Creating todo issue...");
        let created = self.tracker.create_issue(&item.repository, &ticket).await?;

        info!(issue = %item, "Relabeling original issue...");
        transition(
            self.tracker.as_ref(),
            item,
            &self.labels.plan,
            &self.labels.planned,
        )
        .await?;

        info!(issue = %item, created = %created, "Processed");
        Ok(created)
    }
}
