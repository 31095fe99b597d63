//! Completion-backed agents that act on individual steps.

pub mod validator;
