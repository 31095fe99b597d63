//! Side-effecting collaborators: files, processes, configuration, prompts.

pub mod codebase;
pub mod completion;
pub mod config;
pub mod process;
pub mod prompt;
pub mod run_log;
pub mod search;
