// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! RT dialect: task-graph representation of a concrete module.
//!
//! Wraps a specialized LowLFHE module into schedulable tasks with
//! explicit data-dependency edges. This crate only builds and validates
//! the graph; executing tasks is the downstream scheduler's business.
//! The one guarantee provided downstream: the graph reflects every true
//! data dependency, so independent tasks may run in any order or
//! concurrently, but never before their producers.

pub mod error;
pub mod lower;
pub mod task;

pub use error::RtError;
pub use lower::{lower, Partition};
pub use task::{DataEdge, Task, TaskGraph};
