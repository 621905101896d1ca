//! Foundation types shared across the compiler.
//!
//! Stable identifier newtypes and the cryptographic parameter model.
//! Everything here is pure data: no graph logic, no allocation beyond
//! the ids themselves.

mod ids;
mod params;

pub use ids::{KeyId, OpId, ParamRef, TaskId, ValueId};
pub use params::{ParameterSet, SizeDescriptor};
