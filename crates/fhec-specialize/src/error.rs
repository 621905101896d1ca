//! Specialization errors.

use thiserror::Error;

use fhec_ir::{OpId, ParamRef, ParameterSet};

/// Why a specialization run failed as a whole.
///
/// The first two are caller-facing: a resolver configuration gap or a
/// front-end logic error. The last one is defensive and indicates a bug
/// in the dialect implementation itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecializeError {
    #[error("no parameter assignment for reference {reference}")]
    UnresolvedParameter { reference: ParamRef },

    #[error(
        "{op}: ciphertext operand resolved to {ciphertext} but key operand resolved to {key}"
    )]
    ParameterInconsistency {
        op: OpId,
        ciphertext: ParameterSet,
        key: ParameterSet,
    },

    #[error("internal invariant violated: symbolic reference {reference} survived rewriting")]
    InternalInvariantViolation { reference: ParamRef },
}
