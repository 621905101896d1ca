//! IR structural errors.

use thiserror::Error;

use crate::foundation::{OpId, ValueId};

/// Errors raised by structural mutation of a module.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IrError {
    #[error("value {0} does not resolve within this module")]
    DanglingValue(ValueId),

    #[error("operation {0} does not exist or was erased")]
    DanglingOp(OpId),

    #[error("cannot erase {op}: result {value} still has users")]
    OperationInUse { op: OpId, value: ValueId },

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },
}
