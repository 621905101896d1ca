//! End-to-end pipeline tests: specialize, verify, lower, validate.

use fhec_compiler::specialize_and_lower;
use fhec_ir::{attr, verify, OpKind, ParamRef, SizeDescriptor};
use fhec_rt::{lower, Partition};
use fhec_specialize::{run, MapResolver, SpecializeError};
use fhec_tests::{bootstrap_chain, mixed_workload, parameter_set, single_resolver};

#[test]
fn encode_bootstrap_chain_specializes_to_the_resolved_set() {
    let module = bootstrap_chain(1);
    let set = parameter_set(1024);
    let resolver = single_resolver(1, set);

    let concrete = run(&module, &resolver).unwrap();

    assert!(concrete.is_specialized());
    assert!(concrete.symbolic_refs().is_empty());
    let expected = SizeDescriptor::Concrete(set);
    for (_, operation) in concrete.ops_in_order() {
        for &value in operation.operands.iter().chain(&operation.results) {
            if let Some(descriptor) = concrete.value_type(value).unwrap().descriptor() {
                assert_eq!(descriptor, expected);
            }
        }
    }

    let kinds: Vec<OpKind> = concrete.ops_in_order().map(|(_, o)| o.kind).collect();
    assert_eq!(kinds, vec![OpKind::Encode, OpKind::Bootstrap]);
}

#[test]
fn unresolved_reference_fails_and_leaves_the_module_unmodified() {
    let module = bootstrap_chain(0);
    let before = serde_json::to_string(&module).unwrap();

    let err = run(&module, &MapResolver::new()).unwrap_err();
    assert_eq!(
        err,
        SpecializeError::UnresolvedParameter {
            reference: ParamRef::new(0)
        }
    );
    assert_eq!(serde_json::to_string(&module).unwrap(), before);
}

#[test]
fn specialization_is_idempotent() {
    let module = bootstrap_chain(0);
    let resolver = single_resolver(0, parameter_set(1024));

    let once = run(&module, &resolver).unwrap();
    let twice = run(&once, &MapResolver::new()).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn specialization_is_bit_identical_across_runs() {
    let module = mixed_workload(0, 1);
    let resolver = MapResolver::new()
        .with(ParamRef::new(0), parameter_set(1024))
        .with(ParamRef::new(1), parameter_set(2048));

    let first = run(&module, &resolver).unwrap();
    let second = run(&module, &resolver).unwrap();
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    assert_eq!(first.to_string(), second.to_string());
}

#[test]
fn every_operation_kind_survives_the_full_pipeline() {
    let module = mixed_workload(0, 1);
    verify(&module).unwrap();
    let resolver = MapResolver::new()
        .with(ParamRef::new(0), parameter_set(1024))
        .with(ParamRef::new(1), parameter_set(2048));

    let program = specialize_and_lower(&module, &resolver, &Partition::PerOperation).unwrap();

    let before: Vec<OpKind> = module.ops_in_order().map(|(_, o)| o.kind).collect();
    let after: Vec<OpKind> = program.module.ops_in_order().map(|(_, o)| o.kind).collect();
    assert_eq!(before, after);
    assert!(verify(&program.module).is_ok());

    // the rewritten encode carries the resolved set as its attribute
    let (_, encode) = program
        .module
        .ops_in_order()
        .find(|(_, o)| o.kind == OpKind::Encode)
        .unwrap();
    assert_eq!(
        encode.attr(attr::PARAM).unwrap().as_params(),
        Some(parameter_set(1024))
    );
}

#[test]
fn task_graph_is_acyclic_and_edge_complete_at_both_granularities() {
    let module = mixed_workload(0, 1);
    let resolver = MapResolver::new()
        .with(ParamRef::new(0), parameter_set(1024))
        .with(ParamRef::new(1), parameter_set(2048));
    let concrete = run(&module, &resolver).unwrap();

    let fine = lower(&concrete, &Partition::PerOperation).unwrap();
    fine.validate(&concrete).unwrap();
    assert_eq!(fine.task_count(), concrete.op_count());

    // coarse grouping: split the program roughly in half
    let ops: Vec<_> = concrete.ops_in_order().map(|(id, _)| id).collect();
    let (front, back) = ops.split_at(ops.len() / 2);
    let coarse = lower(
        &concrete,
        &Partition::Grouped(vec![front.to_vec(), back.to_vec()]),
    )
    .unwrap();
    coarse.validate(&concrete).unwrap();
    assert_eq!(coarse.task_count(), 2);

    // a task never appears in a level at or before any of its producers
    for graph in [&fine, &coarse] {
        let mut level_of = vec![usize::MAX; graph.task_count()];
        for (index, level) in graph.levels().iter().enumerate() {
            for &task in level {
                level_of[task.index()] = index;
            }
        }
        for task in graph.tasks() {
            for producer in task.dependencies() {
                assert!(level_of[producer.index()] < level_of[task.id.index()]);
            }
        }
    }
}

#[test]
fn inconsistent_resolver_assignment_names_the_bootstrap() {
    // ciphertext and key operands of the bootstrap carry different
    // references, and the resolver maps them to different sets
    let mut module = fhec_ir::Module::new("inconsistent");
    let ct = module.add_input(fhec_ir::Type::Ciphertext(SizeDescriptor::Symbolic(
        ParamRef::new(0),
    )));
    let key = module.add_input(fhec_ir::Type::Key(SizeDescriptor::Symbolic(ParamRef::new(
        1,
    ))));
    let bootstrap = module
        .push_op(
            OpKind::Bootstrap,
            vec![ct, key],
            indexmap::IndexMap::new(),
            vec![fhec_ir::Type::Ciphertext(SizeDescriptor::Symbolic(
                ParamRef::new(0),
            ))],
        )
        .unwrap();
    let resolver = MapResolver::new()
        .with(ParamRef::new(0), parameter_set(1024))
        .with(ParamRef::new(1), parameter_set(2048));

    let err = run(&module, &resolver).unwrap_err();
    match err {
        SpecializeError::ParameterInconsistency {
            op,
            ciphertext,
            key,
        } => {
            assert_eq!(op, bootstrap);
            assert_eq!(ciphertext, parameter_set(1024));
            assert_eq!(key, parameter_set(2048));
        }
        other => panic!("expected ParameterInconsistency, got {other:?}"),
    }
}
