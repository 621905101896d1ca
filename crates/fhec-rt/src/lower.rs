//! Lowering a concrete module into a task graph.
//!
//! Partitions the module's operations into tasks, turns every
//! cross-task value use into an explicit edge, and levels the result
//! with Kahn's algorithm. Grouping is the caller's policy; the
//! invariants (acyclicity, edge completeness) hold at any granularity.

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, instrument};

use fhec_ir::{Module, OpId, TaskId};

use crate::error::RtError;
use crate::task::{DataEdge, Task, TaskGraph};

/// How operations are grouped into tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Partition {
    /// One task per operation: maximal parallelism, maximal scheduling
    /// overhead.
    PerOperation,
    /// Caller-chosen grouping. Must cover every live operation exactly
    /// once; groups keep module program order internally.
    Grouped(Vec<Vec<OpId>>),
}

/// Builds the task graph for a specialized module.
#[instrument(skip_all, fields(module = module.name()))]
pub fn lower(module: &Module, partition: &Partition) -> Result<TaskGraph, RtError> {
    if let Some(&reference) = module.symbolic_refs().first() {
        return Err(RtError::SymbolicModule { reference });
    }

    let groups = resolve_groups(module, partition)?;
    let mut op_to_task: IndexMap<OpId, TaskId> = IndexMap::new();
    for (index, group) in groups.iter().enumerate() {
        for &op in group {
            op_to_task.insert(op, TaskId::new(index as u32));
        }
    }

    let mut tasks: Vec<Task> = groups
        .into_iter()
        .enumerate()
        .map(|(index, ops)| Task {
            id: TaskId::new(index as u32),
            ops,
            inputs: Vec::new(),
            outputs: Vec::new(),
        })
        .collect();

    wire_edges(module, &op_to_task, &mut tasks);

    let levels = topological_levels(&tasks)?;
    debug!(
        tasks = tasks.len(),
        levels = levels.len(),
        "lowered module to task graph"
    );
    Ok(TaskGraph::new(tasks, levels))
}

/// Expands the partition into explicit groups and checks coverage.
fn resolve_groups(module: &Module, partition: &Partition) -> Result<Vec<Vec<OpId>>, RtError> {
    match partition {
        Partition::PerOperation => Ok(module.ops_in_order().map(|(id, _)| vec![id]).collect()),
        Partition::Grouped(groups) => {
            let live: IndexSet<OpId> = module.ops_in_order().map(|(id, _)| id).collect();
            let mut seen: IndexSet<OpId> = IndexSet::new();
            for (index, group) in groups.iter().enumerate() {
                if group.is_empty() {
                    return Err(RtError::EmptyGroup { index });
                }
                for &op in group {
                    if !live.contains(&op) {
                        return Err(RtError::UnknownOperation { op });
                    }
                    if !seen.insert(op) {
                        return Err(RtError::DuplicateOperation { op });
                    }
                }
            }
            if let Some(&missing) = live.iter().find(|op| !seen.contains(*op)) {
                return Err(RtError::UnpartitionedOperation { op: missing });
            }
            Ok(groups.clone())
        }
    }
}

/// Declares one edge per cross-task (value, consumer) pair, plus
/// module-boundary edges with an open end.
fn wire_edges(module: &Module, op_to_task: &IndexMap<OpId, TaskId>, tasks: &mut [Task]) {
    // consumer side
    for task_index in 0..tasks.len() {
        let id = tasks[task_index].id;
        let mut inputs: IndexSet<DataEdge> = IndexSet::new();
        for &op in &tasks[task_index].ops {
            let Some(operation) = module.op(op) else {
                continue;
            };
            for &operand in &operation.operands {
                let producer = module
                    .defining_op(operand)
                    .and_then(|def| op_to_task.get(&def).copied());
                if producer == Some(id) {
                    continue;
                }
                inputs.insert(DataEdge {
                    value: operand,
                    producer,
                    consumer: Some(id),
                });
            }
        }
        tasks[task_index].inputs = inputs.into_iter().collect();
    }

    // producer side mirrors the consumer edges, plus module outputs
    let mut outputs_per_task: Vec<IndexSet<DataEdge>> =
        vec![IndexSet::new(); tasks.len()];
    for task in tasks.iter() {
        for &edge in &task.inputs {
            if let Some(producer) = edge.producer {
                outputs_per_task[producer.index()].insert(edge);
            }
        }
    }
    for &output in module.outputs() {
        if let Some(producer) = module
            .defining_op(output)
            .and_then(|def| op_to_task.get(&def).copied())
        {
            outputs_per_task[producer.index()].insert(DataEdge {
                value: output,
                producer: Some(producer),
                consumer: None,
            });
        }
    }
    for (task, outputs) in tasks.iter_mut().zip(outputs_per_task) {
        task.outputs = outputs.into_iter().collect();
    }
}

/// Kahn's algorithm with level tracking over task dependencies.
fn topological_levels(tasks: &[Task]) -> Result<Vec<Vec<TaskId>>, RtError> {
    if tasks.is_empty() {
        return Ok(Vec::new());
    }

    let mut in_degree: Vec<usize> = vec![0; tasks.len()];
    let mut dependents: Vec<IndexSet<TaskId>> = vec![IndexSet::new(); tasks.len()];
    for task in tasks {
        for producer in task.dependencies() {
            in_degree[task.id.index()] += 1;
            dependents[producer.index()].insert(task.id);
        }
    }

    let mut levels = Vec::new();
    let mut current: Vec<TaskId> = tasks
        .iter()
        .filter(|task| in_degree[task.id.index()] == 0)
        .map(|task| task.id)
        .collect();
    let mut processed = 0;

    while !current.is_empty() {
        // sort for determinism
        current.sort();
        processed += current.len();

        let mut next = Vec::new();
        for &task in &current {
            for &dependent in &dependents[task.index()] {
                let degree = &mut in_degree[dependent.index()];
                *degree -= 1;
                if *degree == 0 {
                    next.push(dependent);
                }
            }
        }
        levels.push(std::mem::take(&mut current));
        current = next;
    }

    if processed != tasks.len() {
        let cycle: Vec<TaskId> = tasks
            .iter()
            .filter(|task| in_degree[task.id.index()] > 0)
            .map(|task| task.id)
            .collect();
        return Err(RtError::CycleDetected { tasks: cycle });
    }
    Ok(levels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fhec_ir::{KeyId, OpKind, ParameterSet, SizeDescriptor, Type};
    use indexmap::IndexMap as Attrs;

    fn concrete_ct() -> Type {
        Type::Ciphertext(SizeDescriptor::Concrete(ParameterSet {
            degree: 1024,
            modulus: 1 << 32,
            key: KeyId::new(0),
            precision: 4,
        }))
    }

    /// in -> negate -> negate -> negate, output at the end.
    fn chain_module() -> (Module, Vec<OpId>) {
        let mut module = Module::new("chain");
        let mut value = module.add_input(concrete_ct());
        let mut ops = Vec::new();
        for _ in 0..3 {
            let op = module
                .push_op(OpKind::Negate, vec![value], Attrs::new(), vec![concrete_ct()])
                .unwrap();
            value = module.op(op).unwrap().results[0];
            ops.push(op);
        }
        module.set_outputs(vec![value]).unwrap();
        (module, ops)
    }

    /// Two independent negates feeding one add.
    fn diamond_module() -> (Module, Vec<OpId>) {
        let mut module = Module::new("diamond");
        let a = module.add_input(concrete_ct());
        let b = module.add_input(concrete_ct());
        let left = module
            .push_op(OpKind::Negate, vec![a], Attrs::new(), vec![concrete_ct()])
            .unwrap();
        let right = module
            .push_op(OpKind::Negate, vec![b], Attrs::new(), vec![concrete_ct()])
            .unwrap();
        let left_value = module.op(left).unwrap().results[0];
        let right_value = module.op(right).unwrap().results[0];
        let add = module
            .push_op(
                OpKind::Add,
                vec![left_value, right_value],
                Attrs::new(),
                vec![concrete_ct()],
            )
            .unwrap();
        let out = module.op(add).unwrap().results[0];
        module.set_outputs(vec![out]).unwrap();
        (module, vec![left, right, add])
    }

    #[test]
    fn per_operation_chain_levels_sequentially() {
        let (module, ops) = chain_module();
        let graph = lower(&module, &Partition::PerOperation).unwrap();

        assert_eq!(graph.task_count(), ops.len());
        assert_eq!(graph.levels().len(), 3);
        for level in graph.levels() {
            assert_eq!(level.len(), 1);
        }
        graph.validate(&module).unwrap();
    }

    #[test]
    fn independent_tasks_share_a_level() {
        let (module, _) = diamond_module();
        let graph = lower(&module, &Partition::PerOperation).unwrap();

        assert_eq!(graph.levels().len(), 2);
        assert_eq!(graph.levels()[0].len(), 2);
        assert_eq!(graph.levels()[1].len(), 1);
        graph.validate(&module).unwrap();
    }

    #[test]
    fn module_boundary_edges_have_open_ends() {
        let (module, ops) = chain_module();
        let graph = lower(&module, &Partition::PerOperation).unwrap();

        let first = graph.task(TaskId::new(0)).unwrap();
        assert_eq!(first.inputs.len(), 1);
        assert_eq!(first.inputs[0].producer, None);

        let last = graph.task(TaskId::new((ops.len() - 1) as u32)).unwrap();
        assert!(last.outputs.iter().any(|edge| edge.consumer.is_none()));
    }

    #[test]
    fn grouped_partition_keeps_edges_complete() {
        let (module, ops) = diamond_module();
        let partition = Partition::Grouped(vec![vec![ops[0], ops[1]], vec![ops[2]]]);
        let graph = lower(&module, &partition).unwrap();

        assert_eq!(graph.task_count(), 2);
        assert_eq!(graph.levels().len(), 2);
        // both negate results cross into the add task
        let add_task = graph.task(TaskId::new(1)).unwrap();
        assert_eq!(
            add_task
                .inputs
                .iter()
                .filter(|edge| edge.producer == Some(TaskId::new(0)))
                .count(),
            2
        );
        graph.validate(&module).unwrap();
    }

    #[test]
    fn grouping_that_introduces_a_cycle_is_rejected() {
        let (module, ops) = chain_module();
        // first and third op in one task, middle op in another:
        // t0 -> t1 (first result) and t1 -> t0 (second result)
        let partition = Partition::Grouped(vec![vec![ops[0], ops[2]], vec![ops[1]]]);

        let err = lower(&module, &partition).unwrap_err();
        assert!(matches!(err, RtError::CycleDetected { .. }));
    }

    #[test]
    fn rejects_symbolic_modules() {
        let mut module = Module::new("symbolic");
        module.add_input(Type::Ciphertext(SizeDescriptor::Symbolic(
            fhec_ir::ParamRef::new(0),
        )));
        let err = lower(&module, &Partition::PerOperation).unwrap_err();
        assert!(matches!(err, RtError::SymbolicModule { .. }));
    }

    #[test]
    fn rejects_incomplete_or_overlapping_partitions() {
        let (module, ops) = chain_module();

        let missing = Partition::Grouped(vec![vec![ops[0], ops[1]]]);
        assert!(matches!(
            lower(&module, &missing).unwrap_err(),
            RtError::UnpartitionedOperation { .. }
        ));

        let duplicated = Partition::Grouped(vec![vec![ops[0], ops[1]], vec![ops[1], ops[2]]]);
        assert!(matches!(
            lower(&module, &duplicated).unwrap_err(),
            RtError::DuplicateOperation { .. }
        ));
    }
}
