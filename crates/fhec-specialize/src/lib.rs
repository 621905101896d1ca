// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Parameter specialization for LowLFHE modules.
//!
//! The unparametrize pass consumes a module whose types and attributes
//! still carry symbolic parameter references, together with an injected
//! [`ParameterResolver`], and produces a fully concrete module. The
//! pass never mutates its input and never emits a partially specialized
//! module: it either succeeds for every reference or fails as a whole.

pub mod error;
pub mod pass;
pub mod resolver;

pub use error::SpecializeError;
pub use pass::run;
pub use resolver::{MapResolver, ParameterResolver};
