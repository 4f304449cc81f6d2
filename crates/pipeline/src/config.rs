//! Runtime configuration.
//!
//! [`LlemyConfig`] is built once at process start from an environment lookup
//! function and passed by reference into every stage. Every recognised option
//! is a named field with a documented default; nothing reads the process
//! environment after construction.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `LLEMY_REPO` | resolved from the working directory |
//! | `LLEMY_PLAN_LABEL` / `LLEMY_PLANNED_LABEL` | `llemy-plan` / `llemy-planned` |
//! | `LLEMY_TODO_LABEL` / `LLEMY_DONE_LABEL` | `llemy-todo` / `llemy-done` |
//! | `ISSUE_LIMIT` / `CONCURRENCY` | `50` / `3` |
//! | `LLEMY_STATE_DIR` | `.llemy` |
//! | `LLEMY_POLL_INTERVAL_MS` / `LLEMY_MAX_POLL_ATTEMPTS` | `5000` / `120` |
//! | `CODEX_BIN` / `CODEX_TIMEOUT_MS` / `CODEX_ARGS_PREFIX` | `codex` / 30 min / `--full-auto` |
//! | `ANTHROPIC_API_KEY` / `CLAUDE_MODEL` | unset / `claude-sonnet-4-20250514` |
//!
//! Paths under the state directory (`LLEMY_PLAN_DIR`, `LLEMY_TODO_DIR`,
//! `LLEMY_TASK_DIR`, `LLEMY_PLAN_SCAN_FILE`, `LLEMY_TODO_SCAN_FILE`) default to
//! children of `LLEMY_STATE_DIR`.

use std::path::PathBuf;
use std::time::Duration;

use crate::{LabelDefinition, LabelName, LlemyError, RepositoryId};

const DEFAULT_STATE_DIR: &str = ".llemy";
const DEFAULT_ISSUE_LIMIT: u32 = 50;
const DEFAULT_CONCURRENCY: usize = 3;
const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;
const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 120;
const DEFAULT_AGENT_TIMEOUT_MS: u64 = 30 * 60 * 1_000;
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const DEFAULT_MAX_TOKENS: u32 = 8_192;
const DEFAULT_API_BASE_URL: &str = "https://api.anthropic.com";

// ---------------------------------------------------------------------------
// Sub-configurations
// ---------------------------------------------------------------------------

/// Label names for each stage of the per-issue state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageLabels {
    /// Issues awaiting planning.
    pub plan: LabelName,
    /// Planned issues (a todo ticket was filed).
    pub planned: LabelName,
    /// Tickets ready for implementation.
    pub todo: LabelName,
    /// Implemented tickets.
    pub done: LabelName,
}

impl StageLabels {
    /// The four labels the bootstrap creates, with their colours and
    /// descriptions.
    pub fn definitions(&self) -> Vec<LabelDefinition> {
        vec![
            LabelDefinition {
                name: self.plan.clone(),
                color: "0e8a16",
                description: "Needs planning by Claude",
            },
            LabelDefinition {
                name: self.planned.clone(),
                color: "1d76db",
                description: "Plan created and ready for handoff",
            },
            LabelDefinition {
                name: self.todo.clone(),
                color: "fbca04",
                description: "Ready for Codex implementation",
            },
            LabelDefinition {
                name: self.done.clone(),
                color: "5319e7",
                description: "Completed by Codex",
            },
        ]
    }
}

/// Bounded polling policy for the handoff waiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between consecutive polls.
    pub interval: Duration,
    /// Total number of polls before giving up (at least 1).
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }
}

/// Settings for the coding-agent CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// Program name or path.
    pub program: String,
    /// Arguments inserted between `exec` and `--cd`.
    pub args_prefix: Vec<String>,
    /// Upper bound on one implementation run.
    pub timeout: Duration,
}

/// Settings for the hosted Messages API (ticket generation mode).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    /// API key; required only when generation mode is used.
    pub api_key: Option<String>,
    /// Base URL without trailing slash.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// `max_tokens` sent with every request.
    pub max_tokens: u32,
    /// Policy document prepended to every prompt.
    pub policy_file: PathBuf,
}

/// File-system locations used by the stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    /// Root state directory.
    pub state_dir: PathBuf,
    /// Plan scan payload.
    pub plan_scan_file: PathBuf,
    /// Todo scan payload.
    pub todo_scan_file: PathBuf,
    /// Plan documents, one per issue.
    pub plan_dir: PathBuf,
    /// Todo documents (handoff artefacts), one per issue.
    pub todo_dir: PathBuf,
    /// Task files written by the todo scan.
    pub task_dir: PathBuf,
    /// Run logs.
    pub logs_dir: PathBuf,
    /// Optional list of repositories for the todo scan.
    pub repositories_file: PathBuf,
}

// ---------------------------------------------------------------------------
// Top-level configuration
// ---------------------------------------------------------------------------

/// Complete runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlemyConfig {
    /// Explicit `owner/name`; when `None` the ambient repository is used.
    pub repository_override: Option<RepositoryId>,
    /// Stage labels.
    pub labels: StageLabels,
    /// Maximum issues listed per repository.
    pub issue_limit: u32,
    /// Batch size for repository scans.
    pub concurrency: usize,
    /// Locations of payloads and artefacts.
    pub paths: Paths,
    /// Handoff polling policy.
    pub poll: PollPolicy,
    /// Source-control CLI program.
    pub gh_program: String,
    /// Coding agent settings.
    pub agent: AgentConfig,
    /// Hosted LLM settings.
    pub llm: LlmConfig,
}

impl LlemyConfig {
    /// Builds the configuration from `lookup`, which returns the raw value of
    /// an environment variable or `None` when unset.
    ///
    /// Blank values count as unset. Numeric values that do not parse as
    /// positive integers fall back to their defaults.
    ///
    /// # Errors
    ///
    /// [`LlemyError::Configuration`] when a label variable holds a
    /// comma-separated list instead of a single label name.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LlemyError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let label = |key: &str, default: &str| -> Result<LabelName, LlemyError> {
            let raw = get(key).unwrap_or_else(|| default.to_string());
            LabelName::new(raw)
                .filter(|l| !l.as_str().contains(','))
                .ok_or_else(|| LlemyError::Configuration {
                    message: format!("{key} must name a single label"),
                })
        };
        let path = |key: &str, default: PathBuf| get(key).map(PathBuf::from).unwrap_or(default);

        let state_dir = path("LLEMY_STATE_DIR", PathBuf::from(DEFAULT_STATE_DIR));
        let paths = Paths {
            plan_scan_file: path(
                "LLEMY_PLAN_SCAN_FILE",
                state_dir.join("llemy-plan-issues.json"),
            ),
            todo_scan_file: path(
                "LLEMY_TODO_SCAN_FILE",
                state_dir.join("llemy-todo-issues.json"),
            ),
            plan_dir: path("LLEMY_PLAN_DIR", state_dir.join("plan")),
            todo_dir: path("LLEMY_TODO_DIR", state_dir.join("todo")),
            task_dir: path("LLEMY_TASK_DIR", state_dir.join("todo-tasks")),
            logs_dir: state_dir.join("logs"),
            repositories_file: path("LLEMY_REPOSITORIES_FILE", PathBuf::from("repositories.txt")),
            state_dir,
        };

        let args_prefix = get("CODEX_ARGS_PREFIX")
            .unwrap_or_else(|| "--full-auto".to_string())
            .split_whitespace()
            .map(str::to_string)
            .collect();

        Ok(Self {
            repository_override: get("LLEMY_REPO").and_then(RepositoryId::new),
            labels: StageLabels {
                plan: label("LLEMY_PLAN_LABEL", "llemy-plan")?,
                planned: label("LLEMY_PLANNED_LABEL", "llemy-planned")?,
                todo: label("LLEMY_TODO_LABEL", "llemy-todo")?,
                done: label("LLEMY_DONE_LABEL", "llemy-done")?,
            },
            issue_limit: positive(get("ISSUE_LIMIT"), DEFAULT_ISSUE_LIMIT),
            concurrency: positive(get("CONCURRENCY"), DEFAULT_CONCURRENCY),
            paths,
            poll: PollPolicy {
                interval: Duration::from_millis(positive(
                    get("LLEMY_POLL_INTERVAL_MS"),
                    DEFAULT_POLL_INTERVAL_MS,
                )),
                max_attempts: positive(get("LLEMY_MAX_POLL_ATTEMPTS"), DEFAULT_MAX_POLL_ATTEMPTS),
            },
            gh_program: get("LLEMY_GH_BIN").unwrap_or_else(|| "gh".to_string()),
            agent: AgentConfig {
                program: get("CODEX_BIN").unwrap_or_else(|| "codex".to_string()),
                args_prefix,
                timeout: Duration::from_millis(positive(
                    get("CODEX_TIMEOUT_MS"),
                    DEFAULT_AGENT_TIMEOUT_MS,
                )),
            },
            llm: LlmConfig {
                api_key: get("ANTHROPIC_API_KEY"),
                base_url: get("ANTHROPIC_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
                    .trim_end_matches('/')
                    .to_string(),
                model: get("CLAUDE_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                max_tokens: positive(get("CLAUDE_MAX_TOKENS"), DEFAULT_MAX_TOKENS),
                policy_file: path("LLEMY_POLICY_FILE", PathBuf::from(".claude").join("claude.md")),
            },
        })
    }

    /// Builds the configuration from the process environment.
    pub fn from_env() -> Result<Self, LlemyError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

/// Parses a positive integer, falling back to `default` for anything else.
fn positive<T>(raw: Option<String>, default: T) -> T
where
    T: std::str::FromStr + PartialOrd + Default,
{
    raw.and_then(|v| v.parse::<T>().ok())
        .filter(|n| *n > T::default())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> LlemyConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LlemyConfig::from_lookup(|key| map.get(key).cloned()).unwrap()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let cfg = config(&[]);
        assert_eq!(cfg.repository_override, None);
        assert_eq!(cfg.labels.plan.as_str(), "llemy-plan");
        assert_eq!(cfg.labels.done.as_str(), "llemy-done");
        assert_eq!(cfg.issue_limit, 50);
        assert_eq!(cfg.concurrency, 3);
        assert_eq!(cfg.poll, PollPolicy::default());
        assert_eq!(cfg.poll.max_attempts, 120);
        assert_eq!(cfg.agent.timeout, Duration::from_secs(1800));
        assert_eq!(cfg.agent.args_prefix, vec!["--full-auto".to_string()]);
        assert_eq!(
            cfg.paths.plan_scan_file,
            PathBuf::from(".llemy").join("llemy-plan-issues.json")
        );
        assert_eq!(cfg.paths.todo_dir, PathBuf::from(".llemy").join("todo"));
        assert_eq!(cfg.llm.base_url, "https://api.anthropic.com");
    }

    #[test]
    fn invalid_numbers_fall_back_to_defaults() {
        let cfg = config(&[
            ("ISSUE_LIMIT", "-4"),
            ("CONCURRENCY", "zero"),
            ("LLEMY_MAX_POLL_ATTEMPTS", "0"),
        ]);
        assert_eq!(cfg.issue_limit, 50);
        assert_eq!(cfg.concurrency, 3);
        assert_eq!(cfg.poll.max_attempts, 120);
    }

    #[test]
    fn overrides_are_honoured() {
        let cfg = config(&[
            ("LLEMY_REPO", " acme/widgets "),
            ("LLEMY_TODO_LABEL", "ready"),
            ("CONCURRENCY", "8"),
            ("LLEMY_STATE_DIR", "/tmp/state"),
            ("CODEX_ARGS_PREFIX", "--model  o3 --full-auto"),
            ("ANTHROPIC_BASE_URL", "http://localhost:9000/"),
        ]);
        assert_eq!(
            cfg.repository_override.as_ref().map(RepositoryId::as_str),
            Some("acme/widgets")
        );
        assert_eq!(cfg.labels.todo.as_str(), "ready");
        assert_eq!(cfg.concurrency, 8);
        assert_eq!(cfg.paths.plan_dir, PathBuf::from("/tmp/state/plan"));
        assert_eq!(cfg.agent.args_prefix, ["--model", "o3", "--full-auto"]);
        assert_eq!(cfg.llm.base_url, "http://localhost:9000");
    }

    #[test]
    fn comma_separated_label_is_rejected() {
        let err = LlemyConfig::from_lookup(|key| {
            (key == "LLEMY_DONE_LABEL").then(|| "done,shipped".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, LlemyError::Configuration { .. }));
    }

    #[test]
    fn label_definitions_follow_configured_names() {
        let cfg = config(&[("LLEMY_PLAN_LABEL", "needs-plan")]);
        let names: Vec<_> = cfg
            .labels
            .definitions()
            .into_iter()
            .map(|d| d.name.to_string())
            .collect();
        assert_eq!(names, ["needs-plan", "llemy-planned", "llemy-todo", "llemy-done"]);
    }
}
