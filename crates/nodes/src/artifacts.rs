//! Local artefact I/O: scan payloads, plan/todo documents, task files, and the
//! repository list.
//!
//! Every write creates missing parent directories. Every failure is reported
//! as [`LlemyError::Artifact`] naming the path.

use std::path::Path;

use pipeline::{IssueNumber, IssueRecord, LlemyError, RepositoryId, ScanPayload};

/// Writes `contents` to `path`, creating parent directories.
pub async fn write_text(path: &Path, contents: &str) -> Result<(), LlemyError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| LlemyError::artifact(parent, &e))?;
    }
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| LlemyError::artifact(path, &e))
}

/// Reads `path` as UTF-8 text.
pub async fn read_text(path: &Path) -> Result<String, LlemyError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| LlemyError::artifact(path, &e))
}

/// Writes `payload` as pretty-printed JSON with a trailing newline.
pub async fn write_payload(path: &Path, payload: &ScanPayload) -> Result<(), LlemyError> {
    let mut json = serde_json::to_string_pretty(payload).map_err(|e| LlemyError::Artifact {
        path: path.to_path_buf(),
        message: format!("Failed to serialise scan payload: {e}"),
    })?;
    json.push('\n');
    write_text(path, &json).await
}

/// Loads a scan payload.
///
/// # Errors
///
/// [`LlemyError::Artifact`] with `Missing input file` when `path` cannot be
/// read, or `Invalid JSON in` when it does not parse.
pub async fn load_payload(path: &Path) -> Result<ScanPayload, LlemyError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|_| LlemyError::Artifact {
            path: path.to_path_buf(),
            message: "Missing input file".to_string(),
        })?;
    serde_json::from_str(&raw).map_err(|_| LlemyError::Artifact {
        path: path.to_path_buf(),
        message: "Invalid JSON in".to_string(),
    })
}

/// Writes one task file per issue into `dir`, named by [`task_file_name`]
/// and holding the issue body. Returns the number of files written.
pub async fn write_task_files(dir: &Path, issues: &[&IssueRecord]) -> Result<usize, LlemyError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| LlemyError::artifact(dir, &e))?;
    for issue in issues {
        let name = task_file_name(&issue.repository, issue.number);
        write_text(&dir.join(name), &format!("{}\n", issue.body_text())).await?;
    }
    Ok(issues.len())
}

/// Task file name for an issue: `<owner>_<name>_<n>.md`.
///
/// Only the `/` separator is replaced; other characters are kept as listed,
/// unlike the plan and todo documents which use [`RepositoryId::slug`].
pub fn task_file_name(repository: &RepositoryId, number: IssueNumber) -> String {
    format!("{}_{number}.md", repository.as_str().replace('/', "_"))
}

/// Reads a repository list: one `owner/name` per line, blank lines and `#`
/// comments ignored.
///
/// Returns `Ok(None)` when the file does not exist.
///
/// # Errors
///
/// [`LlemyError::Configuration`] when the file exists but lists nothing.
pub async fn read_repository_list(path: &Path) -> Result<Option<Vec<RepositoryId>>, LlemyError> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(LlemyError::artifact(path, &e)),
    };

    let repos: Vec<RepositoryId> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .filter_map(RepositoryId::new)
        .collect();

    if repos.is_empty() {
        return Err(LlemyError::Configuration {
            message: format!("{} contains no valid repositories", path.display()),
        });
    }
    Ok(Some(repos))
}

#[cfg(test)]
mod tests {
    use pipeline::{LabelName, RepositoryScan, ScanResult, Timestamp};

    use super::*;

    #[tokio::test]
    async fn missing_and_invalid_payloads_are_distinguished() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        let err = load_payload(&missing).await.unwrap_err();
        assert!(err.to_string().starts_with("Missing input file"));

        let invalid = dir.path().join("bad.json");
        tokio::fs::write(&invalid, "{ not json").await.unwrap();
        let err = load_payload(&invalid).await.unwrap_err();
        assert!(err.to_string().starts_with("Invalid JSON in"));
    }

    #[tokio::test]
    async fn payload_written_then_loaded_keeps_work_items() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("scan.json");
        let repo = RepositoryId::new("acme/widgets").unwrap();
        let mut result = ScanResult::new();
        result.insert(
            repo.clone(),
            RepositoryScan::Listed(vec![IssueRecord {
                repository: repo,
                number: IssueNumber::new(5).unwrap(),
                title: "t".into(),
                url: "u".into(),
                updated_at: None,
                labels: Vec::new(),
                body: None,
            }]),
        );
        let payload = ScanPayload::from_scan(
            &LabelName::new("llemy-plan").unwrap(),
            &result,
            Timestamp::now(),
        );

        write_payload(&path, &payload).await.unwrap();
        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(raw.ends_with("}\n"));

        let loaded = load_payload(&path).await.unwrap();
        assert_eq!(loaded.work_items(), payload.work_items());
    }

    #[tokio::test]
    async fn repository_list_skips_comments_and_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repositories.txt");
        assert_eq!(read_repository_list(&path).await.unwrap(), None);

        tokio::fs::write(&path, "# mine\nacme/widgets\n\n  acme/gadgets  \n")
            .await
            .unwrap();
        let repos = read_repository_list(&path).await.unwrap().unwrap();
        let names: Vec<_> = repos.iter().map(RepositoryId::as_str).collect();
        assert_eq!(names, ["acme/widgets", "acme/gadgets"]);

        tokio::fs::write(&path, "# nothing here\n").await.unwrap();
        assert!(matches!(
            read_repository_list(&path).await,
            Err(LlemyError::Configuration { .. })
        ));
    }

    #[tokio::test]
    async fn task_files_hold_issue_bodies() {
        let dir = tempfile::tempdir().unwrap();
        let issue = IssueRecord {
            repository: RepositoryId::new("acme/widgets").unwrap(),
            number: IssueNumber::new(12).unwrap(),
            title: "t".into(),
            url: "u".into(),
            updated_at: None,
            labels: Vec::new(),
            body: Some("Do the thing".into()),
        };

        let written = write_task_files(dir.path(), &[&issue]).await.unwrap();
        assert_eq!(written, 1);
        let text = tokio::fs::read_to_string(dir.path().join("acme_widgets_12.md"))
            .await
            .unwrap();
        assert_eq!(text, "Do the thing\n");
    }

    #[tokio::test]
    async fn task_file_names_replace_only_the_separator() {
        let dir = tempfile::tempdir().unwrap();
        let repo = RepositoryId::new("acme/my+widgets").unwrap();
        let number = IssueNumber::new(3).unwrap();
        assert_eq!(task_file_name(&repo, number), "acme_my+widgets_3.md");

        let issue = IssueRecord {
            repository: repo,
            number,
            title: "t".into(),
            url: "u".into(),
            updated_at: None,
            labels: Vec::new(),
            body: None,
        };
        write_task_files(dir.path(), &[&issue]).await.unwrap();
        let text = tokio::fs::read_to_string(dir.path().join("acme_my+widgets_3.md"))
            .await
            .unwrap();
        assert_eq!(text, "\n");
    }
}
