//! Llemy pipeline stages.
//!
//! This crate sequences the workflow: the batch scheduler that bounds
//! concurrent tracker calls, the handoff waiter that suspends a run until an
//! out-of-band artefact appears, the scan stage, the plan and implementation
//! stages, the repository bootstrap, and the [`Workflow`] facade that the CLI
//! drives.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** Stages sequence calls between business logic in
//! the [`pipeline`] crate and the port traits it defines (issue tracker,
//! coding agent, ticket generator). They contain no domain rules of their own
//! and never spawn processes or open sockets directly.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`batch`] | Bounded-concurrency batch scheduler |
//! | [`handoff`] | Polling waiter for handoff artefacts |
//! | [`artifacts`] | Payload, document, and task-file I/O |
//! | [`scan`] | Multi-repository issue scan and report |
//! | [`plan`] | `plan → planned` stage |
//! | [`implement`] | `todo → done` stage |
//! | [`bootstrap`] | Directories, env template, and labels |
//! | [`run`] | Shared per-item run loop |
//! | [`workflow`] | One method per CLI command |

pub mod artifacts;
pub mod batch;
pub mod bootstrap;
pub mod handoff;
pub mod implement;
pub mod plan;
pub mod run;
pub mod scan;
pub mod workflow;

pub use batch::{round_count, run_batches};
pub use bootstrap::LabelAction;
pub use handoff::{FsProbe, HandoffWaiter};
pub use implement::{completion_comment, implementation_prompt, ImplementStage};
pub use plan::{PlanDirs, PlanStage, TicketSource};
pub use run::{load_work_items, process_each};
pub use scan::{render_report, ScanStage};
pub use workflow::{load_policy, InitOutcome, ScanOutcome, Workflow};
