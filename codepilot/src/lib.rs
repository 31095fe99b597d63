//! Task orchestration engine for completion-driven code changes.
//!
//! A task goes through two chained pipelines. The planning pipeline turns it
//! into a queue of file-level steps, consulting a web-search provider only
//! when the completion service asks for outside context. The execution
//! pipeline drains that queue, giving the completion service one chance to
//! correct each step before it is dispatched against the codebase.
//!
//! - **[`core`]**: Pure logic (step shapes, literal parsing, line edits,
//!   branch classification, summary rendering). No I/O.
//! - **[`io`]**: Collaborators with side effects (codebase store, completion
//!   and search commands, config, prompts, run artifacts).
//!
//! [`plan`], [`execute`], [`dispatch`], [`agents`] and [`orchestrator`] wire
//! the two together.

pub mod agents;
pub mod core;
pub mod dispatch;
pub mod execute;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod orchestrator;
pub mod plan;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
