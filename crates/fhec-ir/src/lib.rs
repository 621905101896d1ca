// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! LowLFHE intermediate representation
//!
//! This crate defines the typed operation graph the compiler middle-end
//! works on: foundation identifiers, the cryptographic parameter model,
//! the LowLFHE type system and operation set, and the module that owns
//! the graph.
//!
//! The dialect is *closed*: operation kinds are a plain enum and every
//! consumer matches them exhaustively, so adding a kind forces all
//! consuming code through the type checker.

pub mod error;
pub mod foundation;
pub mod module;
pub mod ops;
pub mod print;
pub mod types;
pub mod verify;

pub use error::IrError;
pub use foundation::{KeyId, OpId, ParamRef, ParameterSet, SizeDescriptor, TaskId, ValueId};
pub use module::{KeyInfo, Module, ValueInfo, ValueOrigin};
pub use ops::{attr, Attribute, OpKind, Operation};
pub use types::Type;
pub use verify::{verify, VerifyError};
