//! Codex CLI adapter for the implementation stage.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use pipeline::{AgentConfig, CodingAgent, CommandInvocation, CommandRunner, LlemyError};
use tracing::debug;

/// [`CodingAgent`] running `codex exec <prefix…> --cd <dir> <prompt>`.
pub struct CodexAgent {
    runner: Arc<dyn CommandRunner>,
    config: AgentConfig,
}

impl CodexAgent {
    /// Creates an agent invoking `config.program` through `runner`.
    pub fn new(runner: Arc<dyn CommandRunner>, config: AgentConfig) -> Self {
        Self { runner, config }
    }

    /// Builds the invocation for one implementation run.
    pub fn invocation(&self, prompt: &str, working_dir: &Path) -> CommandInvocation {
        CommandInvocation::new(&self.config.program)
            .args(["exec"])
            .args(self.config.args_prefix.iter().cloned())
            .args(["--cd".to_string(), working_dir.display().to_string()])
            .args([prompt])
            .timeout(self.config.timeout)
    }
}

#[async_trait]
impl CodingAgent for CodexAgent {
    fn name(&self) -> &str {
        "Codex"
    }

    async fn check_ready(&self) -> Result<(), LlemyError> {
        let probe = CommandInvocation::new(&self.config.program).args(["--version"]);
        self.runner
            .run(&probe)
            .await
            .map(drop)
            .map_err(|e| LlemyError::NotReady {
                tool: self.config.program.clone(),
                detail: e.to_string(),
            })
    }

    async fn implement(&self, prompt: &str, working_dir: &Path) -> Result<String, LlemyError> {
        let invocation = self.invocation(prompt, working_dir);
        debug!(
            program = %invocation.program,
            cwd = %working_dir.display(),
            timeout_s = self.config.timeout.as_secs(),
            "Starting agent"
        );
        self.runner.run(&invocation).await
    }
}
