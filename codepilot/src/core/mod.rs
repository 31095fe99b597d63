//! Deterministic, pure logic shared by the planning and execution pipelines.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod decision;
pub mod extract;
pub mod lines;
pub mod literal;
pub mod step_shape;
pub mod summary;
pub mod types;
