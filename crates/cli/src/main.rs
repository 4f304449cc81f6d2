//! Llemy CLI entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Load configuration**: read `.llemy/.env` and `.env` (existing
//!    variables win), then build [`pipeline::LlemyConfig`] from the process
//!    environment.
//! 2. **Wire observability**: configure `tracing-subscriber` with a stderr
//!    layer, a per-command run log, and an optional OpenTelemetry OTLP
//!    exporter. All `tracing` spans and events emitted by every crate in the
//!    workspace flow through these layers.
//! 3. **Construct infrastructure**: create the concrete adapters
//!    (`ProcessRunner`, `GhCli`, `CodexAgent`, `AnthropicClient`) and inject
//!    them into the [`nodes::Workflow`].
//! 4. **Dispatch the command** and map the outcome to the exit status: any
//!    fatal error or any failed work item exits non-zero.

mod telemetry;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use github::GhCli;
use llm::{AnthropicClient, CodexAgent};
use nodes::{load_policy, HandoffWaiter, ScanOutcome, TicketSource, Workflow};
use pipeline::{CommandRunner, IssueTracker, LlemyConfig, PipelineRunId};
use process::ProcessRunner;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::telemetry::TelemetryOptions;

/// Env files read before the configuration is built, in priority order.
const ENV_FILES: [&str; 2] = [".llemy/.env", ".env"];

/// Fallback log directory when the configuration itself is invalid.
const DEFAULT_LOGS_DIR: &str = ".llemy/logs";

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Debug, Parser)]
#[command(
    name = "llemy",
    version,
    about = "Two-stage GitHub issue workflow: plan issues into tickets, then implement tickets with a coding agent"
)]
struct Cli {
    /// Emit log lines as JSON on stderr.
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// Initialize .llemy folders, env template, and labels.
    Init,
    /// Run planning flow (plan label -> todo tickets).
    Plan {
        /// Generate todo documents with the Claude API instead of waiting for a handoff.
        #[arg(long)]
        api: bool,
    },
    /// Run implementation flow (todo label -> done label).
    Do,
    /// Scan for labelled issues and write the scan payload.
    Scan {
        /// Which label to scan for.
        #[arg(value_enum)]
        stage: ScanKind,
    },
    /// Process the plan scan payload.
    ProcessPlan {
        /// Generate todo documents with the Claude API instead of waiting for a handoff.
        #[arg(long)]
        api: bool,
    },
    /// Process the todo scan payload with the coding agent.
    ProcessTodo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ScanKind {
    /// Issues labelled for planning.
    Plan,
    /// Tickets labelled ready for implementation.
    Todo,
}

impl Command {
    /// Name of the run log under the logs directory.
    fn log_name(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Plan { .. } | Self::ProcessPlan { .. } | Self::Scan { stage: ScanKind::Plan } => {
                "plan"
            }
            Self::Do | Self::ProcessTodo | Self::Scan { stage: ScanKind::Todo } => "do",
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let env_files = load_env_files();
    let config = LlemyConfig::from_env();

    let logs_dir = config
        .as_ref()
        .map(|c| c.paths.logs_dir.clone())
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_LOGS_DIR));
    let log_file = logs_dir.join(format!("{}.log", cli.command.log_name()));
    let telemetry = match telemetry::init(TelemetryOptions {
        json: cli.json,
        verbose: cli.verbose,
        log_file: &log_file,
    }) {
        Ok(telemetry) => telemetry,
        Err(e) => {
            eprintln!("{e:#}");
            return ExitCode::FAILURE;
        }
    };

    for (path, outcome) in env_files {
        match outcome {
            Ok(()) => debug!(path = %path.display(), "Loaded env file"),
            Err(e) => warn!(path = %path.display(), error = %e, "Ignoring unreadable env file"),
        }
    }

    let run_id = PipelineRunId::new_random();
    let span = info_span!("llemy", run_id = %run_id, command = cli.command.log_name());
    let outcome = async {
        info!(command = ?cli.command, "=== LLEMY RUN ===");
        match config {
            Ok(config) => run(cli.command, config).await,
            Err(e) => Err(e.into()),
        }
    }
    .instrument(span)
    .await;

    let code = match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    };
    telemetry.shutdown();
    code
}

/// Loads the env files that exist. Returns what happened to each, for
/// logging once the subscriber is installed.
fn load_env_files() -> Vec<(PathBuf, Result<(), dotenvy::Error>)> {
    ENV_FILES
        .iter()
        .map(Path::new)
        .filter(|path| path.is_file())
        .map(|path| (path.to_path_buf(), dotenvy::from_path(path)))
        .collect()
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Runs `command`. `Ok(false)` means the run finished but some work items
/// failed.
async fn run(command: Command, config: LlemyConfig) -> anyhow::Result<bool> {
    let runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner::new());
    let tracker: Arc<dyn IssueTracker> =
        Arc::new(GhCli::new(Arc::clone(&runner), config.gh_program.clone()));
    let workflow = Workflow::new(config, tracker);

    match command {
        Command::Init => {
            let outcome = workflow.init().await?;
            debug!(repo = %outcome.repository, env_created = outcome.env_created, "Init finished");
            Ok(true)
        }
        Command::Plan { api } => {
            scan(&workflow, ScanKind::Plan).await?;
            process_plan(&workflow, api).await
        }
        Command::Do => {
            scan(&workflow, ScanKind::Todo).await?;
            process_todo(&workflow, runner).await
        }
        Command::Scan { stage } => {
            scan(&workflow, stage).await?;
            Ok(true)
        }
        Command::ProcessPlan { api } => process_plan(&workflow, api).await,
        Command::ProcessTodo => process_todo(&workflow, runner).await,
    }
}

async fn scan(workflow: &Workflow, kind: ScanKind) -> anyhow::Result<ScanOutcome> {
    info!("Running {kind:?} scan...");
    let outcome = match kind {
        ScanKind::Plan => workflow.scan_plan().await?,
        ScanKind::Todo => workflow.scan_todo().await?,
    };
    print!("{}", outcome.report);
    Ok(outcome)
}

async fn process_plan(workflow: &Workflow, api: bool) -> anyhow::Result<bool> {
    let config = workflow.config();
    let source = if api {
        let generator = AnthropicClient::from_config(&config.llm)?;
        let policy = load_policy(&config.llm.policy_file).await?;
        info!(model = generator.model(), "Generating todo documents with the Claude API");
        TicketSource::Generated {
            generator: Arc::new(generator),
            policy,
        }
    } else {
        TicketSource::Handoff(HandoffWaiter::on_filesystem(config.poll))
    };

    let summary = workflow.process_plan(source).await?;
    Ok(summary.is_success())
}

async fn process_todo(workflow: &Workflow, runner: Arc<dyn CommandRunner>) -> anyhow::Result<bool> {
    let agent = Arc::new(CodexAgent::new(runner, workflow.config().agent.clone()));
    let working_dir = std::env::current_dir().context("Failed to read the working directory")?;
    let summary = workflow.process_todo(agent, working_dir).await?;
    Ok(summary.is_success())
}
