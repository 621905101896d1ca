//! Task-graph lowering and validation errors.

use thiserror::Error;

use fhec_ir::{OpId, ParamRef, TaskId, ValueId};

/// Errors from RT lowering or task-graph validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RtError {
    #[error("module still carries symbolic reference {reference}; specialize it first")]
    SymbolicModule { reference: ParamRef },

    #[error("partition names {op}, which is not a live operation of this module")]
    UnknownOperation { op: OpId },

    #[error("partition assigns {op} to more than one task")]
    DuplicateOperation { op: OpId },

    #[error("partition leaves {op} unassigned")]
    UnpartitionedOperation { op: OpId },

    #[error("partition group {index} is empty")]
    EmptyGroup { index: usize },

    #[error("task dependency graph has a cycle through {tasks:?}")]
    CycleDetected { tasks: Vec<TaskId> },

    #[error("cross-task use of {value} ({producer:?} -> {consumer:?}) has no declared edge")]
    MissingEdge {
        value: ValueId,
        producer: Option<TaskId>,
        consumer: Option<TaskId>,
    },

    #[error("edge for {value} ({producer:?} -> {consumer:?}) is declared more than once")]
    DuplicateEdge {
        value: ValueId,
        producer: Option<TaskId>,
        consumer: Option<TaskId>,
    },
}
