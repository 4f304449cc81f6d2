//! Per-issue label state machine.
//!
//! Labels are the only state an issue carries through the pipeline:
//!
//! ```text
//! plan ──(todo ticket filed)──▶ planned
//! todo ──(implemented)────────▶ done
//! ```
//!
//! A transition removes the "from" label and adds the "to" label in one
//! tracker call. When that call fails (the label was never there, or a
//! concurrent run already removed it) an add-only call follows. There is no
//! rollback: a failed transition leaves the issue as it was and the next run
//! picks it up again.

use tracing::{debug, warn};

use crate::{IssueRef, IssueTracker, LabelName, LlemyError};

/// How a successful transition was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// `from` was removed and `to` added in one call.
    Swapped,
    /// The combined call failed; only `to` was added.
    AddedOnly,
}

/// Moves `issue` from label `from` to label `to`.
///
/// The add-only fallback is unconditional. When it fails too, the returned
/// [`LlemyError::LabelUpdate`] carries both failures so an authorisation or
/// network problem is not hidden behind the fallback.
pub async fn transition(
    tracker: &dyn IssueTracker,
    issue: &IssueRef,
    from: &LabelName,
    to: &LabelName,
) -> Result<TransitionOutcome, LlemyError> {
    let removal = match tracker.edit_labels(issue, Some(from), to).await {
        Ok(()) => {
            debug!(%issue, %from, %to, "Labels swapped");
            return Ok(TransitionOutcome::Swapped);
        }
        Err(e) => e,
    };

    warn!(%issue, %from, %to, error = %removal, "Remove-and-add failed; adding label only");

    tracker
        .edit_labels(issue, None, to)
        .await
        .map(|()| TransitionOutcome::AddedOnly)
        .map_err(|e| LlemyError::LabelUpdate {
            issue: issue.to_string(),
            detail: e.to_string(),
            removal_detail: removal.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::{
        IssueNumber, IssueQuery, IssueRecord, LabelDefinition, RepositoryId, TodoTicket,
    };

    /// Tracker holding one issue's label set. Removing an absent label fails,
    /// as the GitHub CLI does.
    struct LabelSetTracker {
        labels: Mutex<BTreeSet<String>>,
        calls: Mutex<Vec<(Option<String>, String)>>,
        reject_all: bool,
    }

    impl LabelSetTracker {
        fn with(labels: &[&str]) -> Self {
            Self {
                labels: Mutex::new(labels.iter().map(|l| l.to_string()).collect()),
                calls: Mutex::new(Vec::new()),
                reject_all: false,
            }
        }

        fn labels(&self) -> Vec<String> {
            self.labels.lock().unwrap().iter().cloned().collect()
        }
    }

    #[async_trait]
    impl IssueTracker for LabelSetTracker {
        async fn check_ready(&self) -> Result<(), LlemyError> {
            Ok(())
        }

        async fn current_repository(&self) -> Result<RepositoryId, LlemyError> {
            Err(LlemyError::RepositoryResolution)
        }

        async fn list_issues(
            &self,
            _repository: &RepositoryId,
            _query: &IssueQuery,
        ) -> Result<Vec<IssueRecord>, LlemyError> {
            Ok(Vec::new())
        }

        async fn fetch_issue(&self, _issue: &IssueRef) -> Result<IssueRecord, LlemyError> {
            unreachable!("not used by transitions")
        }

        async fn create_issue(
            &self,
            _repository: &RepositoryId,
            _ticket: &TodoTicket,
        ) -> Result<String, LlemyError> {
            unreachable!("not used by transitions")
        }

        async fn edit_labels(
            &self,
            _issue: &IssueRef,
            remove: Option<&LabelName>,
            add: &LabelName,
        ) -> Result<(), LlemyError> {
            self.calls
                .lock()
                .unwrap()
                .push((remove.map(|l| l.to_string()), add.to_string()));
            if self.reject_all {
                return Err(LlemyError::ExternalCommand {
                    program: "gh".into(),
                    detail: "HTTP 403".into(),
                });
            }
            let mut labels = self.labels.lock().unwrap();
            if let Some(remove) = remove {
                if !labels.remove(remove.as_str()) {
                    return Err(LlemyError::ExternalCommand {
                        program: "gh".into(),
                        detail: format!("'{remove}' not found"),
                    });
                }
            }
            labels.insert(add.to_string());
            Ok(())
        }

        async fn comment(&self, _issue: &IssueRef, _body: &str) -> Result<(), LlemyError> {
            Ok(())
        }

        async fn list_labels(&self, _repository: &RepositoryId) -> Result<Vec<String>, LlemyError> {
            Ok(Vec::new())
        }

        async fn upsert_label(
            &self,
            _repository: &RepositoryId,
            _label: &LabelDefinition,
            _exists: bool,
        ) -> Result<(), LlemyError> {
            Ok(())
        }
    }

    fn issue() -> IssueRef {
        IssueRef::new(
            RepositoryId::new("acme/widgets").unwrap(),
            IssueNumber::new(9).unwrap(),
        )
    }

    fn label(name: &str) -> LabelName {
        LabelName::new(name).unwrap()
    }

    #[tokio::test]
    async fn present_from_label_is_swapped_for_to_label() {
        let tracker = LabelSetTracker::with(&["bug", "llemy-plan"]);
        let outcome = transition(&tracker, &issue(), &label("llemy-plan"), &label("llemy-planned"))
            .await
            .unwrap();

        assert_eq!(outcome, TransitionOutcome::Swapped);
        assert_eq!(tracker.labels(), ["bug", "llemy-planned"]);
    }

    #[tokio::test]
    async fn absent_from_label_falls_back_to_add_only() {
        let tracker = LabelSetTracker::with(&["bug"]);
        let outcome = transition(&tracker, &issue(), &label("llemy-todo"), &label("llemy-done"))
            .await
            .unwrap();

        assert_eq!(outcome, TransitionOutcome::AddedOnly);
        assert_eq!(tracker.labels(), ["bug", "llemy-done"]);
        let calls = tracker.calls.lock().unwrap();
        assert_eq!(
            *calls,
            [
                (Some("llemy-todo".to_string()), "llemy-done".to_string()),
                (None, "llemy-done".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn transition_never_leaves_label_set_unchanged() {
        for start in [&["llemy-todo"][..], &[][..], &["a", "b"][..]] {
            let tracker = LabelSetTracker::with(start);
            let before = tracker.labels();
            transition(&tracker, &issue(), &label("llemy-todo"), &label("llemy-done"))
                .await
                .unwrap();
            let after = tracker.labels();

            assert_ne!(before, after);
            assert!(after.contains(&"llemy-done".to_string()));
            assert!(!after.contains(&"llemy-todo".to_string()));
        }
    }

    #[tokio::test]
    async fn failed_fallback_reports_both_errors_after_exactly_one_retry() {
        let mut tracker = LabelSetTracker::with(&["llemy-todo"]);
        tracker.reject_all = true;

        let err = transition(&tracker, &issue(), &label("llemy-todo"), &label("llemy-done"))
            .await
            .unwrap_err();

        assert_eq!(tracker.calls.lock().unwrap().len(), 2);
        match err {
            LlemyError::LabelUpdate {
                issue,
                detail,
                removal_detail,
            } => {
                assert_eq!(issue, "acme/widgets#9");
                assert!(detail.contains("HTTP 403"));
                assert!(removal_detail.contains("HTTP 403"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
