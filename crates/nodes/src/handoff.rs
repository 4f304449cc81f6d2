//! Handoff waiter.
//!
//! Some steps are completed out of band: a human or a separate agent process
//! reads the plan document and writes the todo document. The waiter turns that
//! into a bounded suspension point by polling for the artefact at a fixed
//! interval. Only presence is checked; the content is validated later by the
//! todo parser.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use pipeline::{ArtifactProbe, LlemyError, PollPolicy};
use tracing::debug;

/// [`ArtifactProbe`] backed by the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsProbe;

#[async_trait]
impl ArtifactProbe for FsProbe {
    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }
}

/// Polls for a handoff artefact under a [`PollPolicy`].
#[derive(Clone)]
pub struct HandoffWaiter {
    probe: Arc<dyn ArtifactProbe>,
    policy: PollPolicy,
}

impl HandoffWaiter {
    /// Creates a waiter using `probe` and `policy`.
    pub fn new(probe: Arc<dyn ArtifactProbe>, policy: PollPolicy) -> Self {
        Self { probe, policy }
    }

    /// Creates a waiter that checks the local file system.
    pub fn on_filesystem(policy: PollPolicy) -> Self {
        Self::new(Arc::new(FsProbe), policy)
    }

    /// The policy this waiter applies.
    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Returns once `path` exists.
    ///
    /// Polls at most `max_attempts` times (at least once), sleeping
    /// `interval` between polls.
    ///
    /// # Errors
    ///
    /// [`LlemyError::HandoffTimeout`] naming `path` when every poll missed.
    pub async fn await_artifact(&self, path: &Path) -> Result<(), LlemyError> {
        let attempts = self.policy.max_attempts.max(1);
        for attempt in 1..=attempts {
            if self.probe.exists(path).await {
                debug!(path = %path.display(), attempt, "Handoff artefact present");
                return Ok(());
            }
            if attempt < attempts {
                tokio::time::sleep(self.policy.interval).await;
            }
        }

        Err(LlemyError::HandoffTimeout {
            path: path.to_path_buf(),
            attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use super::*;

    /// Probe whose artefact appears on the `appears_on`-th poll (never when 0).
    struct CountingProbe {
        polls: AtomicU32,
        appears_on: u32,
    }

    #[async_trait]
    impl ArtifactProbe for CountingProbe {
        async fn exists(&self, _path: &Path) -> bool {
            let n = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
            self.appears_on != 0 && n >= self.appears_on
        }
    }

    fn waiter(appears_on: u32, max_attempts: u32) -> (HandoffWaiter, Arc<CountingProbe>) {
        let probe = Arc::new(CountingProbe {
            polls: AtomicU32::new(0),
            appears_on,
        });
        let policy = PollPolicy {
            interval: Duration::from_millis(1),
            max_attempts,
        };
        (HandoffWaiter::new(probe.clone(), policy), probe)
    }

    #[tokio::test]
    async fn times_out_after_exactly_max_attempts_polls() {
        let (waiter, probe) = waiter(0, 2);
        let err = waiter
            .await_artifact(Path::new(".llemy/todo/acme_widgets_1_todo.md"))
            .await
            .unwrap_err();

        assert_eq!(probe.polls.load(Ordering::SeqCst), 2);
        assert!(err.is_timeout());
        assert!(err.to_string().contains(".llemy/todo/acme_widgets_1_todo.md"));
    }

    #[tokio::test]
    async fn returns_as_soon_as_artefact_appears() {
        let (waiter, probe) = waiter(3, 10);
        waiter.await_artifact(Path::new("todo.md")).await.unwrap();
        assert_eq!(probe.polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn zero_attempts_still_polls_once() {
        let (waiter, probe) = waiter(1, 0);
        waiter.await_artifact(Path::new("todo.md")).await.unwrap();
        assert_eq!(probe.polls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn filesystem_probe_sees_created_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todo.md");
        let waiter = HandoffWaiter::on_filesystem(PollPolicy {
            interval: Duration::from_millis(5),
            max_attempts: 200,
        });

        let writer = {
            let path = path.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                tokio::fs::write(&path, "TITLE: x").await.unwrap();
            })
        };

        waiter.await_artifact(&path).await.unwrap();
        writer.await.unwrap();
    }
}
