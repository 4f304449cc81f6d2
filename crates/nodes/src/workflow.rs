//! Top-level workflow commands.
//!
//! [`Workflow`] owns the configuration and the issue tracker and exposes one
//! method per command: bootstrap, the two scans, and the two processing runs.
//! Each method performs its fatal startup checks (readiness, repository
//! resolution, payload loading) before touching any work item, so a
//! misconfigured run fails fast with a single error.
//!
//! ```text
//!  init          scan_plan ──► plan payload ──► process_plan ──► todo tickets
//!                scan_todo ──► todo payload ──► process_todo ──► done
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pipeline::{
    resolve_repository, CodingAgent, IssueTracker, LlemyConfig, LlemyError, RepositoryId,
    RunSummary, ScanPayload, ScanResult, Timestamp,
};
use tracing::info;

use crate::artifacts::{read_repository_list, write_payload, write_task_files};
use crate::bootstrap::{ensure_directories, ensure_env_file, ensure_labels, LabelAction};
use crate::implement::ImplementStage;
use crate::plan::{PlanDirs, PlanStage, TicketSource};
use crate::run::load_work_items;
use crate::scan::{render_report, ScanStage};

/// Result of a scan command.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    /// Human-readable report for stdout.
    pub report: String,
    /// The payload that was written.
    pub payload: ScanPayload,
    /// Where the payload was written.
    pub payload_path: PathBuf,
    /// Number of task files written (todo scan only).
    pub task_files: usize,
}

/// Result of the bootstrap command.
#[derive(Debug, Clone)]
pub struct InitOutcome {
    /// The repository that was initialised.
    pub repository: RepositoryId,
    /// `true` when the `.env` template was written.
    pub env_created: bool,
    /// Per-label outcome.
    pub labels: Vec<(String, LabelAction)>,
}

/// Reads the policy document used in generation mode.
///
/// # Errors
///
/// [`LlemyError::Configuration`] when the file is missing or unreadable.
pub async fn load_policy(path: &Path) -> Result<String, LlemyError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|_| LlemyError::Configuration {
            message: format!("Missing CLAUDE.md policy file at {}", path.display()),
        })
}

/// Runs the workflow commands against one issue tracker.
pub struct Workflow {
    config: LlemyConfig,
    tracker: Arc<dyn IssueTracker>,
}

impl Workflow {
    /// Creates a workflow.
    pub fn new(config: LlemyConfig, tracker: Arc<dyn IssueTracker>) -> Self {
        Self { config, tracker }
    }

    /// The active configuration.
    pub fn config(&self) -> &LlemyConfig {
        &self.config
    }

    async fn repository(&self) -> Result<RepositoryId, LlemyError> {
        resolve_repository(
            self.tracker.as_ref(),
            self.config.repository_override.as_ref(),
        )
        .await
    }

    /// Prepares the working tree and the repository's labels.
    pub async fn init(&self) -> Result<InitOutcome, LlemyError> {
        self.tracker.check_ready().await?;
        let repository = self.repository().await?;
        info!(repo = %repository, "Initializing LLEMY for {repository}");

        ensure_directories(&self.config.paths).await?;
        let env_created = ensure_env_file(&self.config.paths.state_dir, &self.config.labels).await?;
        let labels = ensure_labels(self.tracker.as_ref(), &repository, &self.config.labels).await?;

        info!("LLEMY init complete.");
        Ok(InitOutcome {
            repository,
            env_created,
            labels,
        })
    }

    /// Lists `plan`-labelled issues in the current repository and writes the
    /// plan scan payload.
    pub async fn scan_plan(&self) -> Result<ScanOutcome, LlemyError> {
        self.tracker.check_ready().await?;
        let repository = self.repository().await?;

        let label = &self.config.labels.plan;
        let result = self.scanner().scan(&[repository], label, false).await;
        let payload = ScanPayload::from_scan(label, &result, Timestamp::now());
        let path = self.config.paths.plan_scan_file.clone();
        write_payload(&path, &payload).await?;
        info!(path = %path.display(), issues = result.issues().count(), "Wrote plan scan");

        Ok(ScanOutcome {
            report: render_report(&result),
            payload,
            payload_path: path,
            task_files: 0,
        })
    }

    /// Lists `todo`-labelled issues, writes the todo scan payload, and writes
    /// one task file per issue.
    ///
    /// Repositories come from the repository list file when it exists,
    /// otherwise the current repository is scanned.
    pub async fn scan_todo(&self) -> Result<ScanOutcome, LlemyError> {
        let listed = read_repository_list(&self.config.paths.repositories_file).await?;
        self.tracker.check_ready().await?;
        let repositories = match listed {
            Some(repos) => repos,
            None => vec![self.repository().await?],
        };

        let label = &self.config.labels.todo;
        let result = self.scanner().scan(&repositories, label, true).await;
        let payload = ScanPayload::from_scan(label, &result, Timestamp::now());
        let path = self.config.paths.todo_scan_file.clone();
        write_payload(&path, &payload).await?;
        let task_files = self.write_tasks(&result).await?;
        info!(
            path = %path.display(),
            issues = result.issues().count(),
            task_files,
            "Wrote todo scan"
        );

        Ok(ScanOutcome {
            report: render_report(&result),
            payload,
            payload_path: path,
            task_files,
        })
    }

    /// Files a todo ticket for every work item in the plan scan payload.
    pub async fn process_plan(&self, source: TicketSource) -> Result<RunSummary, LlemyError> {
        let items = load_work_items(&self.config.paths.plan_scan_file).await?;
        self.tracker.check_ready().await?;

        let stage = PlanStage::new(
            Arc::clone(&self.tracker),
            source,
            self.config.labels.clone(),
            PlanDirs {
                plan_dir: self.config.paths.plan_dir.clone(),
                todo_dir: self.config.paths.todo_dir.clone(),
            },
        );
        Ok(stage.run(&items).await)
    }

    /// Runs the coding agent on every work item in the todo scan payload.
    pub async fn process_todo(
        &self,
        agent: Arc<dyn CodingAgent>,
        working_dir: PathBuf,
    ) -> Result<RunSummary, LlemyError> {
        let items = load_work_items(&self.config.paths.todo_scan_file).await?;
        self.tracker.check_ready().await?;
        agent.check_ready().await?;

        let stage = ImplementStage::new(
            Arc::clone(&self.tracker),
            agent,
            self.config.labels.clone(),
            working_dir,
        );
        Ok(stage.run(&items).await)
    }

    fn scanner(&self) -> ScanStage {
        ScanStage::new(
            Arc::clone(&self.tracker),
            self.config.concurrency,
            self.config.issue_limit,
        )
    }

    async fn write_tasks(&self, result: &ScanResult) -> Result<usize, LlemyError> {
        let issues: Vec<_> = result.issues().collect();
        write_task_files(&self.config.paths.task_dir, &issues).await
    }
}
