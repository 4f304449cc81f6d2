//! Llemy GitHub infrastructure adapter.
//!
//! Implements the [`pipeline::IssueTracker`] trait by driving the `gh` CLI
//! through a [`pipeline::CommandRunner`]. Using the CLI rather than the REST
//! API means Llemy inherits the user's existing `gh auth` session and needs no
//! token handling of its own.
//!
//! ## Architectural Layer
//!
//! **Infrastructure adapter.** No domain logic lives here. This crate only
//! builds `gh` argument lists and translates `gh --json` output into
//! `pipeline` types.
//!
//! ## Commands used
//!
//! | Operation | `gh` invocation |
//! |-----------|-----------------|
//! | readiness | `--version`, `auth status` |
//! | current repository | `repo view --json nameWithOwner` |
//! | list | `issue list --repo R --label L --state open --limit N --json …` |
//! | fetch | `issue view N --repo R --json number,title,url,body` |
//! | create | `issue create --repo R --title T --body B --label L…` |
//! | relabel | `issue edit N --repo R [--remove-label A] --add-label B` |
//! | comment | `issue comment N --repo R --body B` |
//! | labels | `label list`, `label create`, `label edit` |

use std::sync::Arc;

use async_trait::async_trait;
use pipeline::{
    lenient, CommandInvocation, CommandRunner, IssueNumber, IssueQuery, IssueRecord, IssueRef,
    IssueTracker, LabelDefinition, LabelName, LlemyError, RepositoryId, TodoTicket,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Fields requested from `gh issue list`.
const LIST_FIELDS: &str = "number,title,url,updatedAt,labels";

/// Upper bound on `gh label list`.
const LABEL_LIST_LIMIT: &str = "200";

// ---------------------------------------------------------------------------
// gh JSON shapes
// ---------------------------------------------------------------------------

/// One `gh issue list` / `gh issue view` row. Only `number` must be valid.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GhIssue {
    number: u64,
    #[serde(default, deserialize_with = "lenient::string")]
    title: String,
    #[serde(default, deserialize_with = "lenient::string")]
    url: String,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    updated_at: Option<String>,
    #[serde(default, deserialize_with = "lenient::label_names")]
    labels: Vec<String>,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    body: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GhRepo {
    #[serde(default)]
    name_with_owner: Option<String>,
}

impl GhIssue {
    fn into_record(self, repository: RepositoryId) -> Option<IssueRecord> {
        Some(IssueRecord {
            repository,
            number: IssueNumber::new(self.number)?,
            title: self.title,
            url: self.url,
            updated_at: self.updated_at,
            labels: self.labels,
            body: self.body,
        })
    }
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// [`IssueTracker`] backed by the `gh` CLI.
#[derive(Clone)]
pub struct GhCli {
    runner: Arc<dyn CommandRunner>,
    program: String,
}

impl GhCli {
    /// Creates an adapter invoking `program` (usually `gh`) through `runner`.
    pub fn new(runner: Arc<dyn CommandRunner>, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }

    async fn gh<I, S>(&self, args: I) -> Result<String, LlemyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let invocation = CommandInvocation::new(&self.program).args(args);
        debug!(args = ?invocation.args, "gh");
        self.runner.run(&invocation).await
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(raw: &str, what: &str) -> Result<T, LlemyError> {
    serde_json::from_str(raw).map_err(|e| LlemyError::Query {
        message: format!("Failed to parse {what}: {e}"),
    })
}

#[async_trait]
impl IssueTracker for GhCli {
    async fn check_ready(&self) -> Result<(), LlemyError> {
        let not_ready = |e: LlemyError| LlemyError::NotReady {
            tool: "gh".to_string(),
            detail: e.to_string(),
        };
        self.gh(["--version"]).await.map_err(not_ready)?;
        self.gh(["auth", "status"]).await.map_err(not_ready)?;
        Ok(())
    }

    async fn current_repository(&self) -> Result<RepositoryId, LlemyError> {
        let raw = self.gh(["repo", "view", "--json", "nameWithOwner"]).await?;
        let repo: GhRepo = parse_json(&raw, "gh repo view JSON")?;
        repo.name_with_owner
            .and_then(RepositoryId::new)
            .ok_or(LlemyError::RepositoryResolution)
    }

    async fn list_issues(
        &self,
        repository: &RepositoryId,
        query: &IssueQuery,
    ) -> Result<Vec<IssueRecord>, LlemyError> {
        let fields = if query.include_body {
            format!("{LIST_FIELDS},body")
        } else {
            LIST_FIELDS.to_string()
        };
        let raw = self
            .gh([
                "issue".to_string(),
                "list".to_string(),
                "--repo".to_string(),
                repository.to_string(),
                "--label".to_string(),
                query.label.to_string(),
                "--state".to_string(),
                "open".to_string(),
                "--limit".to_string(),
                query.limit.to_string(),
                "--json".to_string(),
                fields,
            ])
            .await?;

        // Rows are decoded one by one so a malformed row drops only itself.
        let rows: Vec<Value> = parse_json(&raw, "gh issue list JSON")?;
        let total = rows.len();
        let records: Vec<IssueRecord> = rows
            .into_iter()
            .filter_map(|row| serde_json::from_value::<GhIssue>(row).ok())
            .filter_map(|row| row.into_record(repository.clone()))
            .collect();
        if records.len() < total {
            warn!(
                repo = %repository,
                skipped = total - records.len(),
                "Skipped malformed issue rows"
            );
        }
        Ok(records)
    }

    async fn fetch_issue(&self, issue: &IssueRef) -> Result<IssueRecord, LlemyError> {
        let raw = self
            .gh([
                "issue".to_string(),
                "view".to_string(),
                issue.number.to_string(),
                "--repo".to_string(),
                issue.repository.to_string(),
                "--json".to_string(),
                "number,title,url,body".to_string(),
            ])
            .await?;

        let parse_error = || LlemyError::Query {
            message: format!("Failed to parse issue JSON for {issue}"),
        };
        let row: GhIssue = serde_json::from_str(&raw).map_err(|_| parse_error())?;
        row.into_record(issue.repository.clone())
            .ok_or_else(parse_error)
    }

    async fn create_issue(
        &self,
        repository: &RepositoryId,
        ticket: &TodoTicket,
    ) -> Result<String, LlemyError> {
        let mut args = vec![
            "issue".to_string(),
            "create".to_string(),
            "--repo".to_string(),
            repository.to_string(),
            "--title".to_string(),
            ticket.title.clone(),
            "--body".to_string(),
            ticket.body.clone(),
        ];
        for label in &ticket.labels {
            args.push("--label".to_string());
            args.push(label.to_string());
        }
        let url = self.gh(args).await?;
        info!(repo = %repository, url = %url, "Created issue");
        Ok(url)
    }

    async fn edit_labels(
        &self,
        issue: &IssueRef,
        remove: Option<&LabelName>,
        add: &LabelName,
    ) -> Result<(), LlemyError> {
        let mut args = vec![
            "issue".to_string(),
            "edit".to_string(),
            issue.number.to_string(),
            "--repo".to_string(),
            issue.repository.to_string(),
        ];
        if let Some(remove) = remove {
            args.push("--remove-label".to_string());
            args.push(remove.to_string());
        }
        args.push("--add-label".to_string());
        args.push(add.to_string());
        self.gh(args).await.map(drop)
    }

    async fn comment(&self, issue: &IssueRef, body: &str) -> Result<(), LlemyError> {
        self.gh([
            "issue".to_string(),
            "comment".to_string(),
            issue.number.to_string(),
            "--repo".to_string(),
            issue.repository.to_string(),
            "--body".to_string(),
            body.to_string(),
        ])
        .await
        .map(drop)
    }

    async fn list_labels(&self, repository: &RepositoryId) -> Result<Vec<String>, LlemyError> {
        let raw = self
            .gh([
                "label".to_string(),
                "list".to_string(),
                "--repo".to_string(),
                repository.to_string(),
                "--limit".to_string(),
                LABEL_LIST_LIMIT.to_string(),
                "--json".to_string(),
                "name".to_string(),
            ])
            .await?;
        let rows: Vec<Value> = parse_json(&raw, "gh label list JSON")?;
        Ok(rows
            .iter()
            .filter(|row| row.is_object())
            .filter_map(lenient::label_name)
            .collect())
    }

    async fn upsert_label(
        &self,
        repository: &RepositoryId,
        label: &LabelDefinition,
        exists: bool,
    ) -> Result<(), LlemyError> {
        let verb = if exists { "edit" } else { "create" };
        self.gh([
            "label".to_string(),
            verb.to_string(),
            label.name.to_string(),
            "--repo".to_string(),
            repository.to_string(),
            "--color".to_string(),
            label.color.to_string(),
            "--description".to_string(),
            label.description.to_string(),
        ])
        .await
        .map(drop)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Records every invocation and replays canned results in order.
    #[derive(Default)]
    struct ScriptedRunner {
        calls: Mutex<Vec<Vec<String>>>,
        replies: Mutex<VecDeque<Result<String, LlemyError>>>,
    }

    impl ScriptedRunner {
        fn replying(replies: Vec<Result<String, LlemyError>>) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                replies: Mutex::new(replies.into()),
            })
        }

        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(&self, invocation: &CommandInvocation) -> Result<String, LlemyError> {
            assert_eq!(invocation.program, "gh");
            self.calls.lock().unwrap().push(invocation.args.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(String::new()))
        }
    }

    fn gh_error(detail: &str) -> Result<String, LlemyError> {
        Err(LlemyError::ExternalCommand {
            program: "gh".into(),
            detail: detail.into(),
        })
    }

    fn repo() -> RepositoryId {
        RepositoryId::new("acme/widgets").unwrap()
    }

    fn issue(n: u64) -> IssueRef {
        IssueRef::new(repo(), IssueNumber::new(n).unwrap())
    }

    #[tokio::test]
    async fn list_parses_labels_and_skips_invalid_numbers() {
        let runner = ScriptedRunner::replying(vec![Ok(r#"[
            {"number": 3, "title": "Add gears", "url": "https://github.com/acme/widgets/issues/3",
             "updatedAt": "2024-05-01T10:00:00Z",
             "labels": [{"name": "llemy-plan"}, {"name": " "}]},
            {"number": 0, "title": "broken"}
        ]"#
        .to_string())]);
        let gh = GhCli::new(runner.clone(), "gh");
        let query = IssueQuery {
            label: LabelName::new("llemy-plan").unwrap(),
            limit: 50,
            include_body: false,
        };

        let issues = gh.list_issues(&repo(), &query).await.unwrap();

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].labels, ["llemy-plan"]);
        assert_eq!(issues[0].updated_at.as_deref(), Some("2024-05-01T10:00:00Z"));
        assert_eq!(
            runner.calls()[0],
            [
                "issue", "list", "--repo", "acme/widgets", "--label", "llemy-plan", "--state",
                "open", "--limit", "50", "--json", "number,title,url,updatedAt,labels"
            ]
        );
    }

    #[tokio::test]
    async fn odd_label_entries_do_not_fail_the_listing() {
        let runner = ScriptedRunner::replying(vec![Ok(r#"[
            {"number": 1, "title": "One", "labels": [{"name": "llemy-plan"}, {"name": 5}]},
            {"number": 2, "title": "Two", "labels": [null, {"name": "x"}]}
        ]"#
        .to_string())]);
        let gh = GhCli::new(runner, "gh");
        let query = IssueQuery {
            label: LabelName::new("llemy-plan").unwrap(),
            limit: 50,
            include_body: false,
        };

        let issues = gh.list_issues(&repo(), &query).await.unwrap();

        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].labels, ["llemy-plan"]);
        assert_eq!(issues[1].labels, ["x"]);
    }

    #[tokio::test]
    async fn rows_with_unusable_numbers_are_dropped_alone() {
        let runner = ScriptedRunner::replying(vec![Ok(r#"[
            {"number": null, "title": "null"},
            {"number": 4.5, "title": "float"},
            {"number": -3, "title": "negative"},
            {"title": "missing"},
            "garbage",
            {"number": 9, "title": null, "url": 7, "updatedAt": "yesterday"}
        ]"#
        .to_string())]);
        let gh = GhCli::new(runner, "gh");
        let query = IssueQuery {
            label: LabelName::new("llemy-plan").unwrap(),
            limit: 50,
            include_body: false,
        };

        let issues = gh.list_issues(&repo(), &query).await.unwrap();

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_ref(), issue(9));
        assert_eq!(issues[0].title, "");
        assert_eq!(issues[0].url, "");
        assert_eq!(issues[0].updated_at.as_deref(), Some("yesterday"));
    }

    #[tokio::test]
    async fn list_requests_bodies_when_asked() {
        let runner = ScriptedRunner::replying(vec![Ok("[]".into())]);
        let gh = GhCli::new(runner.clone(), "gh");
        let query = IssueQuery {
            label: LabelName::new("llemy-todo").unwrap(),
            limit: 10,
            include_body: true,
        };

        gh.list_issues(&repo(), &query).await.unwrap();
        assert_eq!(
            runner.calls()[0].last().unwrap(),
            "number,title,url,updatedAt,labels,body"
        );
    }

    #[tokio::test]
    async fn malformed_listing_is_a_query_error() {
        let runner = ScriptedRunner::replying(vec![Ok("not json".into())]);
        let gh = GhCli::new(runner, "gh");
        let query = IssueQuery {
            label: LabelName::new("llemy-plan").unwrap(),
            limit: 50,
            include_body: false,
        };

        let err = gh.list_issues(&repo(), &query).await.unwrap_err();
        assert!(matches!(err, LlemyError::Query { .. }));
    }

    #[tokio::test]
    async fn fetch_parse_failure_names_the_issue() {
        let runner = ScriptedRunner::replying(vec![Ok("{".into())]);
        let gh = GhCli::new(runner, "gh");

        let err = gh.fetch_issue(&issue(8)).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to parse issue JSON for acme/widgets#8");
    }

    #[tokio::test]
    async fn create_passes_one_label_flag_per_label() {
        let runner = ScriptedRunner::replying(vec![Ok(
            "https://github.com/acme/widgets/issues/12".into()
        )]);
        let gh = GhCli::new(runner.clone(), "gh");
        let ticket = TodoTicket {
            title: "Do it".into(),
            labels: vec![
                LabelName::new("llemy-todo").unwrap(),
                LabelName::new("backend").unwrap(),
            ],
            body: "Steps".into(),
        };

        let url = gh.create_issue(&repo(), &ticket).await.unwrap();

        assert_eq!(url, "https://github.com/acme/widgets/issues/12");
        assert_eq!(
            runner.calls()[0],
            [
                "issue", "create", "--repo", "acme/widgets", "--title", "Do it", "--body",
                "Steps", "--label", "llemy-todo", "--label", "backend"
            ]
        );
    }

    #[tokio::test]
    async fn edit_without_removal_only_adds() {
        let runner = ScriptedRunner::replying(Vec::new());
        let gh = GhCli::new(runner.clone(), "gh");

        gh.edit_labels(&issue(5), None, &LabelName::new("llemy-done").unwrap())
            .await
            .unwrap();
        gh.edit_labels(
            &issue(5),
            Some(&LabelName::new("llemy-todo").unwrap()),
            &LabelName::new("llemy-done").unwrap(),
        )
        .await
        .unwrap();

        let calls = runner.calls();
        assert_eq!(
            calls[0],
            ["issue", "edit", "5", "--repo", "acme/widgets", "--add-label", "llemy-done"]
        );
        assert_eq!(
            calls[1],
            [
                "issue",
                "edit",
                "5",
                "--repo",
                "acme/widgets",
                "--remove-label",
                "llemy-todo",
                "--add-label",
                "llemy-done"
            ]
        );
    }

    #[tokio::test]
    async fn readiness_failure_is_not_ready() {
        let runner = ScriptedRunner::replying(vec![
            Ok("gh version 2.50.0".into()),
            gh_error("not logged in"),
        ]);
        let gh = GhCli::new(runner.clone(), "gh");

        let err = gh.check_ready().await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "gh CLI not available or not authenticated: gh failed: not logged in"
        );
        assert_eq!(runner.calls()[1], ["auth", "status"]);
    }

    #[tokio::test]
    async fn current_repository_reads_name_with_owner() {
        let runner = ScriptedRunner::replying(vec![
            Ok(r#"{"nameWithOwner":"acme/widgets"}"#.into()),
            Ok(r#"{"nameWithOwner":"  "}"#.into()),
        ]);
        let gh = GhCli::new(runner, "gh");

        assert_eq!(gh.current_repository().await.unwrap(), repo());
        assert_eq!(
            gh.current_repository().await.unwrap_err(),
            LlemyError::RepositoryResolution
        );
    }

    #[tokio::test]
    async fn label_list_keeps_only_string_names() {
        let runner = ScriptedRunner::replying(vec![Ok(
            r#"[{"name":"llemy-todo"},{"name":5},null,{"name":" "},{"color":"fff"},{"name":"bug"}]"#
                .into(),
        )]);
        let gh = GhCli::new(runner, "gh");

        assert_eq!(gh.list_labels(&repo()).await.unwrap(), ["llemy-todo", "bug"]);
    }

    #[tokio::test]
    async fn label_upsert_chooses_create_or_edit() {
        let runner = ScriptedRunner::replying(vec![Ok(
            r#"[{"name":"llemy-plan"},{"name":"bug"}]"#.into()
        )]);
        let gh = GhCli::new(runner.clone(), "gh");
        let definition = LabelDefinition {
            name: LabelName::new("llemy-plan").unwrap(),
            color: "0e8a16",
            description: "Needs planning by Claude",
        };

        assert_eq!(gh.list_labels(&repo()).await.unwrap(), ["llemy-plan", "bug"]);
        gh.upsert_label(&repo(), &definition, true).await.unwrap();
        gh.upsert_label(&repo(), &definition, false).await.unwrap();

        let calls = runner.calls();
        assert_eq!(&calls[1][..3], ["label", "edit", "llemy-plan"]);
        assert_eq!(&calls[2][..3], ["label", "create", "llemy-plan"]);
        assert_eq!(
            &calls[2][3..],
            [
                "--repo",
                "acme/widgets",
                "--color",
                "0e8a16",
                "--description",
                "Needs planning by Claude"
            ]
        );
    }
}
