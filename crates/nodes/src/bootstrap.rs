//! Repository bootstrap: local state directories, the `.env` template, and
//! the four stage labels.
//!
//! Every step is idempotent. Directories are created when missing, the env
//! template is never overwritten, and labels that already exist are updated
//! in place rather than recreated.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use pipeline::{IssueTracker, LlemyError, Paths, RepositoryId, StageLabels};
use tracing::info;

use crate::artifacts::write_text;

/// What happened to one stage label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelAction {
    /// The label did not exist and was created.
    Created,
    /// The label existed; colour and description were refreshed.
    Updated,
}

/// Creates the state, plan, todo, and logs directories. Returns them in
/// creation order.
pub async fn ensure_directories(paths: &Paths) -> Result<Vec<PathBuf>, LlemyError> {
    let dirs = [
        paths.state_dir.clone(),
        paths.plan_dir.clone(),
        paths.todo_dir.clone(),
        paths.logs_dir.clone(),
    ];
    for dir in &dirs {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| LlemyError::artifact(dir, &e))?;
        info!(path = %dir.display(), "Created: {}", dir.display());
    }
    Ok(dirs.to_vec())
}

/// The `.env` template written by [`ensure_env_file`].
pub fn env_template(labels: &StageLabels) -> String {
    let plan = format!("LLEMY_PLAN_LABEL={}", labels.plan);
    let todo = format!("LLEMY_TODO_LABEL={}", labels.todo);
    [
        "# LLEMY settings",
        "",
        "# Optional override if running outside the target repository",
        "# LLEMY_REPO=owner/name",
        "",
        "# Labels",
        plan.as_str(),
        todo.as_str(),
        "# LLEMY_PLANNED_LABEL and LLEMY_DONE_LABEL override the remaining stages",
        "",
        "# Optional Claude API mode (llemy plan --api)",
        "# ANTHROPIC_API_KEY=",
        "# CLAUDE_MODEL=claude-sonnet-4-20250514",
        "",
    ]
    .join("\n")
}

/// Writes `<state_dir>/.env` from the template unless it already exists.
///
/// Returns `true` when the file was created.
pub async fn ensure_env_file(state_dir: &Path, labels: &StageLabels) -> Result<bool, LlemyError> {
    let path = state_dir.join(".env");
    let exists = tokio::fs::try_exists(&path)
        .await
        .map_err(|e| LlemyError::artifact(&path, &e))?;
    if exists {
        info!(path = %path.display(), "Exists: {}", path.display());
        return Ok(false);
    }
    write_text(&path, &env_template(labels)).await?;
    info!(path = %path.display(), "Created: {}", path.display());
    Ok(true)
}

/// Creates or updates the four stage labels in `repository`.
pub async fn ensure_labels(
    tracker: &dyn IssueTracker,
    repository: &RepositoryId,
    labels: &StageLabels,
) -> Result<Vec<(String, LabelAction)>, LlemyError> {
    let existing: BTreeSet<String> = tracker
        .list_labels(repository)
        .await?
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();

    let mut actions = Vec::new();
    for definition in labels.definitions() {
        let exists = existing.contains(definition.name.as_str());
        tracker.upsert_label(repository, &definition, exists).await?;
        let action = if exists {
            info!(label = %definition.name, "Updated label: {}", definition.name);
            LabelAction::Updated
        } else {
            info!(label = %definition.name, "Created label: {}", definition.name);
            LabelAction::Created
        };
        actions.push((definition.name.to_string(), action));
    }
    Ok(actions)
}
