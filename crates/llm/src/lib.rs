//! Llemy model and agent infrastructure adapters.
//!
//! Implements two `pipeline` ports:
//!
//! - [`pipeline::TicketGenerator`] for Anthropic's Messages API
//!   ([`AnthropicClient`]), used when the plan stage generates todo documents
//!   itself instead of waiting for a handoff.
//! - [`pipeline::CodingAgent`] for the Codex CLI ([`CodexAgent`]), used by the
//!   implementation stage.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP transport, request formatting, response parsing,
//! and agent argument layout live here. The [`pipeline`] crate sees only the
//! port traits.

pub mod anthropic;
pub mod codex;

pub use anthropic::{generation_prompt, AnthropicClient};
pub use codex::CodexAgent;
