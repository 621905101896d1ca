//! Task-graph data model.
//!
//! A task wraps one or more concrete operations; every data dependency
//! that crosses a task boundary is an explicit [`DataEdge`]. Levels are
//! topological: tasks within one level share no transitive dependency
//! and may execute concurrently.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use fhec_ir::{Module, OpId, TaskId, ValueId};

use crate::error::RtError;

/// One value flowing across a task boundary.
///
/// `producer == None` means the value is a module input; `consumer ==
/// None` means it leaves the module as an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataEdge {
    pub value: ValueId,
    pub producer: Option<TaskId>,
    pub consumer: Option<TaskId>,
}

/// A schedulable unit wrapping a run of operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// Wrapped operations, in module program order.
    pub ops: Vec<OpId>,
    /// Values this task needs before it can run.
    pub inputs: Vec<DataEdge>,
    /// Values this task hands to other tasks or module outputs.
    pub outputs: Vec<DataEdge>,
}

impl Task {
    /// Distinct tasks this one depends on, in input order.
    pub fn dependencies(&self) -> IndexSet<TaskId> {
        self.inputs
            .iter()
            .filter_map(|edge| edge.producer)
            .collect()
    }
}

/// The full dependency-tracked task graph for one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskGraph {
    tasks: Vec<Task>,
    /// Topological levels; tasks inside one level are independent.
    levels: Vec<Vec<TaskId>>,
}

impl TaskGraph {
    pub(crate) fn new(tasks: Vec<Task>, levels: Vec<Vec<TaskId>>) -> Self {
        Self { tasks, levels }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(id.index())
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn levels(&self) -> &[Vec<TaskId>] {
        &self.levels
    }

    /// Re-checks the graph invariants against the module it was lowered
    /// from: every cross-task value use has exactly one declared edge,
    /// and no task is scheduled before its producers.
    ///
    /// Downstream schedulers can call this as a cheap contract check.
    pub fn validate(&self, module: &Module) -> Result<(), RtError> {
        self.check_edge_completeness(module)?;
        self.check_levels()
    }

    fn check_edge_completeness(&self, module: &Module) -> Result<(), RtError> {
        let mut op_to_task: Vec<Option<TaskId>> = Vec::new();
        for task in &self.tasks {
            for &op in &task.ops {
                let index = op.index();
                if op_to_task.len() <= index {
                    op_to_task.resize(index + 1, None);
                }
                op_to_task[index] = Some(task.id);
            }
        }
        let task_of = |op: OpId| op_to_task.get(op.index()).copied().flatten();

        for task in &self.tasks {
            for &op in &task.ops {
                let Some(operation) = module.op(op) else {
                    return Err(RtError::UnknownOperation { op });
                };
                for &operand in &operation.operands {
                    let producer = module.defining_op(operand).and_then(task_of);
                    if producer == Some(task.id) {
                        continue;
                    }
                    let declared = task
                        .inputs
                        .iter()
                        .filter(|edge| {
                            edge.value == operand
                                && edge.producer == producer
                                && edge.consumer == Some(task.id)
                        })
                        .count();
                    match declared {
                        1 => {}
                        0 => {
                            return Err(RtError::MissingEdge {
                                value: operand,
                                producer,
                                consumer: Some(task.id),
                            })
                        }
                        _ => {
                            return Err(RtError::DuplicateEdge {
                                value: operand,
                                producer,
                                consumer: Some(task.id),
                            })
                        }
                    }
                }
            }
        }

        // producer side: every cross-task input edge and every module
        // output must be declared exactly once by the producing task.
        for task in &self.tasks {
            for edge in &task.inputs {
                let Some(producer) = edge.producer else {
                    continue;
                };
                self.check_declared_output(producer, *edge)?;
            }
        }
        for &output in module.outputs() {
            let Some(producer) = module.defining_op(output).and_then(task_of) else {
                continue;
            };
            self.check_declared_output(
                producer,
                DataEdge {
                    value: output,
                    producer: Some(producer),
                    consumer: None,
                },
            )?;
        }
        Ok(())
    }

    fn check_declared_output(&self, producer: TaskId, edge: DataEdge) -> Result<(), RtError> {
        let declared = self
            .task(producer)
            .map(|task| task.outputs.iter().filter(|&&out| out == edge).count())
            .unwrap_or(0);
        match declared {
            1 => Ok(()),
            0 => Err(RtError::MissingEdge {
                value: edge.value,
                producer: edge.producer,
                consumer: edge.consumer,
            }),
            _ => Err(RtError::DuplicateEdge {
                value: edge.value,
                producer: edge.producer,
                consumer: edge.consumer,
            }),
        }
    }

    fn check_levels(&self) -> Result<(), RtError> {
        let mut level_of: Vec<Option<usize>> = vec![None; self.tasks.len()];
        for (index, level) in self.levels.iter().enumerate() {
            for &task in level {
                if let Some(slot) = level_of.get_mut(task.index()) {
                    *slot = Some(index);
                }
            }
        }

        let mut unleveled: Vec<TaskId> = Vec::new();
        for task in &self.tasks {
            let Some(level) = level_of.get(task.id.index()).copied().flatten() else {
                unleveled.push(task.id);
                continue;
            };
            for producer in task.dependencies() {
                let producer_level = level_of.get(producer.index()).copied().flatten();
                if producer_level.is_none_or(|p| p >= level) {
                    return Err(RtError::CycleDetected {
                        tasks: vec![producer, task.id],
                    });
                }
            }
        }
        if !unleveled.is_empty() {
            return Err(RtError::CycleDetected { tasks: unleveled });
        }
        Ok(())
    }
}
